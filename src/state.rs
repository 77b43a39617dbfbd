use crate::domain::dispatcher::EventDispatcher;
use crate::utils::token_codec::TokenCodec;

/// State shared by every pixel request.
///
/// The codec is read-only; the dispatcher only holds channel senders.
#[derive(Clone)]
pub struct PixelState {
    pub codec: TokenCodec,
    pub dispatcher: EventDispatcher,
    pub behind_proxy: bool,
}

impl PixelState {
    pub fn new(codec: TokenCodec, dispatcher: EventDispatcher, behind_proxy: bool) -> Self {
        Self {
            codec,
            dispatcher,
            behind_proxy,
        }
    }
}

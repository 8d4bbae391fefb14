use std::sync::Arc;

use application::ChatGateway;
use infrastructure::ChannelTransport;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
    pub transport: Arc<ChannelTransport>,
}

impl AppState {
    pub fn new(gateway: Arc<ChatGateway>, transport: Arc<ChannelTransport>) -> Self {
        Self { gateway, transport }
    }
}

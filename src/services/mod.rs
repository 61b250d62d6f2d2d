pub mod atomic_metrics;
pub mod card_gateway;
pub mod checkout_api_client;
pub mod confirmation_poller;
pub mod error;
pub mod http_client;
pub mod payment_service;
pub mod pix_gateway;
pub mod token_cache;

pub use card_gateway::{CardGateway, CardGatewayClient};
pub use confirmation_poller::{ConfirmationPoller, PollHandle, PollOutcome, StatusCheck};
pub use error::ServiceError;
pub use payment_service::PaymentService;
pub use pix_gateway::{PixGateway, PixGatewayClient};
pub use token_cache::{AccessToken, TokenCache};

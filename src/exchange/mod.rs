pub mod factory;
mod traits;

pub use factory::build_broker_client;
pub use traits::BrokerApi;

#[cfg(test)]
pub use traits::MockBrokerApi;

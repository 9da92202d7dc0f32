pub mod broker;
pub mod completions;

pub use broker::BrokerCommand;
pub use completions::CompletionsCommand;

mod output_provider;
mod reconstructor;
mod term_fetcher;

pub use output_provider::DataOutput;
pub use reconstructor::FileReconstructor;

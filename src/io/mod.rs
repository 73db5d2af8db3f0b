mod fetcher;
mod http_fetcher;

pub use fetcher::ImageFetcher;
pub use http_fetcher::HttpImageFetcher;

pub mod save_file_service;
pub mod save_locator;

pub use save_file_service::SaveFileService;
pub use save_locator::SaveLocator;

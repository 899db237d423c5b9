pub mod color_display;
pub mod genie;
pub mod icon_display;
pub mod inference;
pub mod paint;
pub mod text_input;
pub mod url_loader;

pub use color_display::ColorDisplayCapability;
pub use genie::GenieCapability;
pub use icon_display::IconDisplayCapability;
pub use inference::InferenceCapability;
pub use paint::PaintCapability;
pub use text_input::TextInputCapability;
pub use url_loader::UrlLoaderCapability;

mod markup;
mod probe;
mod resolver;
mod video;


pub use markup::*;
pub use probe::*;
pub use resolver::*;
pub use video::*;

pub const DEFAULT_THUMBNAIL: &str = "/images/default-thumbnail.jpg";

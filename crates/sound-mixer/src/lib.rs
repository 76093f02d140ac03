mod catalog;
mod mixer;
mod playback;
mod timer;


pub use catalog::*;
pub use mixer::*;
pub use playback::*;
pub use timer::*;

pub mod history;
pub mod hover;
pub mod refresh;
pub mod settings;
pub mod source;

pub use history::*;
pub use hover::*;
pub use refresh::*;
pub use settings::*;
pub use source::*;

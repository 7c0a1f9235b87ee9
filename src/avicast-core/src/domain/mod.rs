mod forecast;
mod grid;
mod observation;
mod period;
mod species;

pub use forecast::*;
pub use grid::*;
pub use observation::*;
pub use period::*;
pub use species::*;

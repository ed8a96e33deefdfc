pub mod background;
pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod roi;
pub mod stack;
pub mod transform;

//! Listing views for dirpilot.
//!
//! A [`FileView`] shows either a real directory or a custom list of paths
//! collected from anywhere. Its selection feeds [`cpmv_files`], and its
//! anchor directory feeds [`expand_macros`].

mod custom;
mod filter;
mod macros;
mod transfer;
mod view;

pub use custom::CustomList;
pub use filter::LocalFilter;
pub use macros::{BLACKHOLE_REGISTER, Registers, expand_macros};
pub use transfer::{TransferOptions, cpmv_files};
pub use view::FileView;

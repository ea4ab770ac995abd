pub mod blob_selector;
pub mod frame_rate;
pub mod luma;
pub mod mask;
pub mod mode_controller;
pub mod motion_extractor;
pub mod overlay;
pub mod recorder;
pub mod region;
pub mod tracker;

pub mod fx_chain_view;
pub mod main_view;
pub mod options_view;
pub mod toasts;

mod common;
mod orchestration;
mod routing;

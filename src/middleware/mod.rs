pub mod stamping;

pub mod mode;
pub mod packet;
pub mod s2k;

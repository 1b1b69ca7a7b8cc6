pub mod de;
pub mod domain;
pub mod dto;

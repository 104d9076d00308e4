pub mod backups;
pub mod fallback;
pub mod health;

pub mod google_drive;
#[cfg(test)]
pub mod memory;
pub mod traits;

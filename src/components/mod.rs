pub mod account_verification;
pub mod home;
pub mod login;
pub mod server_entry;

pub use account_verification::AccountVerificationScreen;
pub use home::HomeScreen;
pub use login::TvLoginScreen;
pub use server_entry::ServerEntryScreen;

pub mod artist;
pub mod concert;
pub mod ticket;
pub mod transaction;
pub mod user;
pub mod views;
pub mod wallet;

pub use artist::Artist;
pub use concert::Concert;
pub use ticket::{Ticket, TicketFilter, TicketGroupRow, TicketStatus};
pub use transaction::Transaction;
pub use user::{StrengthStatus, User};
pub use views::{ConcertDetails, TicketDetails, TicketGroup, TransactionDetails, UserProfile};
pub use wallet::Wallet;

pub mod event;
pub mod scan;
pub mod ticket;
pub mod token;

pub use event::{Event, EventSummary};
pub use scan::{EventAttendance, ScanAuditRecord};
pub use ticket::{Ticket, TicketStatus, TicketSummary};
pub use token::{IssuedToken, NewIssuedToken};

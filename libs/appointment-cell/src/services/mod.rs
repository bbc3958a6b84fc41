pub mod booking;
pub mod clock;
pub mod filter;
pub mod lifecycle;
pub mod meeting;
pub mod notification;
pub mod projection;
pub mod store;
pub mod supabase_store;
pub mod validation;

pub use booking::AppointmentBookingService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use filter::{AppointmentFilterService, StatusVocabulary};
pub use lifecycle::{AppointmentAction, AppointmentLifecycleService, TRANSITIONS};
pub use meeting::{MeetingLinkGenerator, SecureMeetingLinkGenerator};
pub use notification::{AppointmentNotifier, TracingNotifier};
pub use projection::{AppointmentView, RoleViewProjector};
pub use store::{AppointmentStore, InMemoryAppointmentStore};
pub use supabase_store::SupabaseAppointmentStore;

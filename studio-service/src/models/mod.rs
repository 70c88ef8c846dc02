//! Domain models for studio-service.

mod booking;
mod catalog;
mod client;
mod editing;
mod invoice;
mod payment;
mod settings;

pub use booking::{Booking, BookingFilter, BookingStatus, CreateBooking, PhotoSelection, UpdateBooking};
pub use catalog::{CreateSessionPackage, SessionCategory, SessionPackage};
pub use client::{Client, ClientStats, ClientView, CreateClient, FinancialStatus, UpdateClient};
pub use editing::{
    CreateEditingJob, CreateEditingStatus, EditingJob, EditingJobFilter, EditingStatus, Priority,
    RevisionNote, UpdateEditingJob, UpdateEditingStatus, WorkflowStage,
};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceDetails, InvoiceFilter, InvoiceItem, InvoiceStatus,
    UpdateInvoice,
};
pub use payment::{Payment, PaymentAccount, RecordPayment};
pub use settings::{StudioSettings, UpdateSettings};

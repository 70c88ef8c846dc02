//! Request bodies and query strings for the HTTP layer.
//!
//! Shape checks live here (`validator`); business rules stay in the engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    BookingFilter, BookingStatus, CreateBooking, CreateClient, CreateEditingJob,
    CreateEditingStatus, CreateInvoice, CreateSessionPackage, EditingJobFilter, InvoiceFilter,
    InvoiceItem, InvoiceStatus, Priority, RecordPayment, UpdateBooking, UpdateClient,
    UpdateEditingJob, UpdateEditingStatus, UpdateInvoice, UpdateSettings, WorkflowStage,
};

// -----------------------------------------------------------------------------
// Clients
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl From<CreateClientRequest> for CreateClient {
    fn from(req: CreateClientRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            email: req.email,
            join_date: req.join_date,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(req: UpdateClientRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            email: req.email,
            notes: req.notes,
        }
    }
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub price: Decimal,
}

impl From<CreatePackageRequest> for CreateSessionPackage {
    fn from(req: CreatePackageRequest) -> Self {
        Self {
            category_id: req.category_id,
            name: req.name,
            price: req.price,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentAccountRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub details: Option<String>,
}

// -----------------------------------------------------------------------------
// Bookings
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub client_id: Uuid,
    pub session_category_id: Uuid,
    pub session_package_id: Uuid,
    pub photographer_id: Option<Uuid>,
    pub session_date: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

impl From<CreateBookingRequest> for CreateBooking {
    fn from(req: CreateBookingRequest) -> Self {
        Self {
            client_id: req.client_id,
            session_category_id: req.session_category_id,
            session_package_id: req.session_package_id,
            photographer_id: req.photographer_id,
            session_date: req.session_date,
            status: req.status,
            notes: req.notes,
            location: req.location,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub session_category_id: Option<Uuid>,
    pub session_package_id: Option<Uuid>,
    pub photographer_id: Option<Uuid>,
    pub session_date: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

impl From<UpdateBookingRequest> for UpdateBooking {
    fn from(req: UpdateBookingRequest) -> Self {
        Self {
            session_category_id: req.session_category_id,
            session_package_id: req.session_package_id,
            photographer_id: req.photographer_id,
            session_date: req.session_date,
            status: req.status,
            notes: req.notes,
            location: req.location,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub client_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<BookingListQuery> for BookingFilter {
    fn from(q: BookingListQuery) -> Self {
        Self {
            client_id: q.client_id,
            status: q.status,
            from: q.from,
            to: q.to,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddSelectionRequest {
    #[validate(length(min = 1, max = 255, message = "Photo name is required"))]
    pub name: String,
}

// -----------------------------------------------------------------------------
// Invoices
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub booking_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<InvoiceItem>,
    pub amount_override: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl From<CreateInvoiceRequest> for CreateInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        Self {
            booking_id: req.booking_id,
            items: req.items,
            amount_override: req.amount_override,
            issue_date: req.issue_date,
            due_date: req.due_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceItemsRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<NaiveDate>,
    pub amount_override: Option<Decimal>,
    #[serde(default)]
    pub clear_override: bool,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        Self {
            due_date: req.due_date,
            amount_override: req.amount_override,
            clear_override: req.clear_override,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub account_id: Uuid,
    #[validate(length(max = 500))]
    pub method_notes: Option<String>,
    #[validate(length(max = 100))]
    pub recorded_by: Option<String>,
}

impl From<RecordPaymentRequest> for RecordPayment {
    fn from(req: RecordPaymentRequest) -> Self {
        Self {
            amount: req.amount,
            payment_date: req.payment_date,
            account_id: req.account_id,
            method_notes: req.method_notes,
            recorded_by: req.recorded_by,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub client_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

impl From<InvoiceListQuery> for InvoiceFilter {
    fn from(q: InvoiceListQuery) -> Self {
        Self {
            client_id: q.client_id,
            booking_id: q.booking_id,
            status: q.status,
            unpaid_due_before: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AgingQuery {
    pub as_of: Option<NaiveDate>,
}

// -----------------------------------------------------------------------------
// Editing
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEditingJobRequest {
    pub booking_id: Uuid,
    pub editor_id: Option<Uuid>,
    pub priority: Option<Priority>,
    #[validate(url(message = "Drive folder must be a URL"))]
    pub drive_folder_url: Option<String>,
    pub photographer_notes: Option<String>,
}

impl CreateEditingJobRequest {
    pub fn into_parts(self) -> (Uuid, CreateEditingJob) {
        (
            self.booking_id,
            CreateEditingJob {
                editor_id: self.editor_id,
                priority: self.priority,
                drive_folder_url: self.drive_folder_url,
                photographer_notes: self.photographer_notes,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEditingJobRequest {
    pub editor_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub upload_date: Option<NaiveDate>,
    #[validate(url(message = "Drive folder must be a URL"))]
    pub drive_folder_url: Option<String>,
    pub photographer_notes: Option<String>,
}

impl From<UpdateEditingJobRequest> for UpdateEditingJob {
    fn from(req: UpdateEditingJobRequest) -> Self {
        Self {
            editor_id: req.editor_id,
            priority: req.priority,
            upload_date: req.upload_date,
            drive_folder_url: req.drive_folder_url,
            photographer_notes: req.photographer_notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveJobRequest {
    pub status_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevisionRequest {
    #[validate(length(min = 1, max = 2000, message = "Note is required"))]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EditingJobListQuery {
    pub status_id: Option<Uuid>,
    pub editor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

impl From<EditingJobListQuery> for EditingJobFilter {
    fn from(q: EditingJobListQuery) -> Self {
        Self {
            status_id: q.status_id,
            editor_id: q.editor_id,
            client_id: q.client_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEditingStatusRequest {
    #[validate(length(min = 1, max = 60, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub color: String,
    pub stage: WorkflowStage,
    pub sort_order: Option<i32>,
}

impl From<CreateEditingStatusRequest> for CreateEditingStatus {
    fn from(req: CreateEditingStatusRequest) -> Self {
        Self {
            name: req.name,
            color: req.color,
            stage: req.stage,
            sort_order: req.sort_order,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEditingStatusRequest {
    #[validate(length(min = 1, max = 60))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

impl From<UpdateEditingStatusRequest> for UpdateEditingStatus {
    fn from(req: UpdateEditingStatusRequest) -> Self {
        Self {
            name: req.name,
            color: req.color,
            sort_order: req.sort_order,
        }
    }
}

// -----------------------------------------------------------------------------
// Settings
// -----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 100))]
    pub studio_name: Option<String>,
    pub automated_reminders_enabled: Option<bool>,
}

impl From<UpdateSettingsRequest> for UpdateSettings {
    fn from(req: UpdateSettingsRequest) -> Self {
        Self {
            studio_name: req.studio_name,
            automated_reminders_enabled: req.automated_reminders_enabled,
        }
    }
}

//! PostgreSQL store for studio-service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, Client, EditingJob, EditingJobFilter, EditingStatus, Invoice,
    InvoiceFilter, Payment, PaymentAccount, SessionCategory, SessionPackage, StudioSettings,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{Store, UnitOfWork};

const CLIENT_COLUMNS: &str = "client_id, name, phone, email, join_date, total_bookings, \
     total_spent, notes, created_utc, updated_utc";
const BOOKING_COLUMNS: &str = "booking_id, client_id, session_category_id, session_package_id, \
     photographer_id, session_date, status, invoice_id, notes, location, photo_selections, \
     created_utc, updated_utc";
const INVOICE_COLUMNS: &str = "invoice_id, booking_id, client_id, items, amount, \
     amount_overridden, amount_paid, issue_date, due_date, status, last_reminder_sent, \
     created_utc, updated_utc";
const PAYMENT_COLUMNS: &str = "payment_id, invoice_id, payment_date, amount, account_id, \
     method_notes, recorded_by, created_utc";
const JOB_COLUMNS: &str = "job_id, booking_id, client_id, editor_id, status_id, upload_date, \
     drive_folder_url, photographer_notes, priority, revision_count, revision_notes, \
     created_utc, updated_utc";
const STATUS_COLUMNS: &str = "status_id, name, color, sort_order, stage, created_utc";

/// Map a sqlx error, turning constraint violations into conflicts.
fn map_db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("{}: duplicate record", operation))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::Conflict(anyhow::anyhow!(
                "{}: record is referenced or references a missing record",
                operation
            ))
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, e)),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "studio-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// Unit of work over one PostgreSQL transaction. Dropped without commit rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(client_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get client"))?;
        timer.observe_duration();
        Ok(client)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_client"])
            .start_timer();
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1 FOR UPDATE");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(client_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("lock client"))?;
        timer.observe_duration();
        Ok(client)
    }

    #[instrument(skip(self))]
    async fn list_clients(&mut self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name, client_id");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list clients"))?;
        timer.observe_duration();
        Ok(clients)
    }

    #[instrument(skip(self, client), fields(client_id = %client.client_id))]
    async fn save_client(&mut self, client: &Client) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_client"])
            .start_timer();
        sqlx::query(
            r#"
            INSERT INTO clients (client_id, name, phone, email, join_date, total_bookings,
                                 total_spent, notes, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (client_id) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                join_date = EXCLUDED.join_date,
                total_bookings = EXCLUDED.total_bookings,
                total_spent = EXCLUDED.total_spent,
                notes = EXCLUDED.notes,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(client.client_id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(client.join_date)
        .bind(client.total_bookings)
        .bind(client.total_spent)
        .bind(&client.notes)
        .bind(client.created_utc)
        .bind(client.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save client"))?;
        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn delete_client(&mut self, client_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete client"))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    async fn get_category(
        &mut self,
        category_id: Uuid,
    ) -> Result<Option<SessionCategory>, AppError> {
        sqlx::query_as::<_, SessionCategory>(
            "SELECT category_id, name, description, created_utc FROM session_categories WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error("get category"))
    }

    async fn list_categories(&mut self) -> Result<Vec<SessionCategory>, AppError> {
        sqlx::query_as::<_, SessionCategory>(
            "SELECT category_id, name, description, created_utc FROM session_categories ORDER BY name",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error("list categories"))
    }

    async fn save_category(&mut self, category: &SessionCategory) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO session_categories (category_id, name, description, created_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (category_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description
            "#,
        )
        .bind(category.category_id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save category"))?;
        Ok(())
    }

    async fn delete_category(&mut self, category_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM session_categories WHERE category_id = $1")
            .bind(category_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete category"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn category_in_use(&mut self, category_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM bookings WHERE session_category_id = $1)
                OR EXISTS (SELECT 1 FROM session_packages WHERE category_id = $1)
            "#,
        )
        .bind(category_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error("check category usage"))
    }

    async fn get_package(&mut self, package_id: Uuid) -> Result<Option<SessionPackage>, AppError> {
        sqlx::query_as::<_, SessionPackage>(
            "SELECT package_id, category_id, name, price, created_utc FROM session_packages WHERE package_id = $1",
        )
        .bind(package_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error("get package"))
    }

    async fn list_packages(&mut self) -> Result<Vec<SessionPackage>, AppError> {
        sqlx::query_as::<_, SessionPackage>(
            "SELECT package_id, category_id, name, price, created_utc FROM session_packages ORDER BY name",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error("list packages"))
    }

    async fn save_package(&mut self, package: &SessionPackage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO session_packages (package_id, category_id, name, price, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (package_id) DO UPDATE SET
                category_id = EXCLUDED.category_id,
                name = EXCLUDED.name,
                price = EXCLUDED.price
            "#,
        )
        .bind(package.package_id)
        .bind(package.category_id)
        .bind(&package.name)
        .bind(package.price)
        .bind(package.created_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save package"))?;
        Ok(())
    }

    async fn delete_package(&mut self, package_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM session_packages WHERE package_id = $1")
            .bind(package_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete package"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn package_in_use(&mut self, package_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE session_package_id = $1)",
        )
        .bind(package_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error("check package usage"))
    }

    async fn get_payment_account(
        &mut self,
        account_id: Uuid,
    ) -> Result<Option<PaymentAccount>, AppError> {
        sqlx::query_as::<_, PaymentAccount>(
            "SELECT account_id, name, details, created_utc FROM payment_accounts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error("get payment account"))
    }

    async fn list_payment_accounts(&mut self) -> Result<Vec<PaymentAccount>, AppError> {
        sqlx::query_as::<_, PaymentAccount>(
            "SELECT account_id, name, details, created_utc FROM payment_accounts ORDER BY name",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error("list payment accounts"))
    }

    async fn save_payment_account(&mut self, account: &PaymentAccount) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_accounts (account_id, name, details, created_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id) DO UPDATE SET
                name = EXCLUDED.name,
                details = EXCLUDED.details
            "#,
        )
        .bind(account.account_id)
        .bind(&account.name)
        .bind(&account.details)
        .bind(account.created_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save payment account"))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bookings
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn get_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_booking"])
            .start_timer();
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get booking"))?;
        timer.observe_duration();
        Ok(booking)
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn lock_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_booking"])
            .start_timer();
        let sql =
            format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1 FOR UPDATE");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("lock booking"))?;
        timer.observe_duration();
        Ok(booking)
    }

    #[instrument(skip(self, filter))]
    async fn list_bookings(&mut self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bookings"])
            .start_timer();
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::timestamptz IS NULL OR session_date >= $3)
              AND ($4::timestamptz IS NULL OR session_date <= $4)
            ORDER BY session_date, booking_id
            "#
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(filter.client_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list bookings"))?;
        timer.observe_duration();
        Ok(bookings)
    }

    #[instrument(skip(self, booking), fields(booking_id = %booking.booking_id))]
    async fn save_booking(&mut self, booking: &Booking) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_booking"])
            .start_timer();
        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, client_id, session_category_id, session_package_id,
                                  photographer_id, session_date, status, invoice_id, notes,
                                  location, photo_selections, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (booking_id) DO UPDATE SET
                session_category_id = EXCLUDED.session_category_id,
                session_package_id = EXCLUDED.session_package_id,
                photographer_id = EXCLUDED.photographer_id,
                session_date = EXCLUDED.session_date,
                status = EXCLUDED.status,
                invoice_id = EXCLUDED.invoice_id,
                notes = EXCLUDED.notes,
                location = EXCLUDED.location,
                photo_selections = EXCLUDED.photo_selections,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(booking.booking_id)
        .bind(booking.client_id)
        .bind(booking.session_category_id)
        .bind(booking.session_package_id)
        .bind(booking.photographer_id)
        .bind(booking.session_date)
        .bind(&booking.status)
        .bind(booking.invoice_id)
        .bind(&booking.notes)
        .bind(&booking.location)
        .bind(&booking.photo_selections)
        .bind(booking.created_utc)
        .bind(booking.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save booking"))?;
        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn delete_booking(&mut self, booking_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete booking"))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get invoice"))?;
        timer.observe_duration();
        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn lock_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_invoice"])
            .start_timer();
        let sql =
            format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("lock invoice"))?;
        timer.observe_duration();
        Ok(invoice)
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(&mut self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();
        let sql = format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2::uuid IS NULL OR booking_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::date IS NULL OR (status <> 'paid' AND due_date < $4))
            ORDER BY issue_date, created_utc
            "#
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(filter.client_id)
            .bind(filter.booking_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.unpaid_due_before)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list invoices"))?;
        timer.observe_duration();
        Ok(invoices)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.invoice_id))]
    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_invoice"])
            .start_timer();
        sqlx::query(
            r#"
            INSERT INTO invoices (invoice_id, booking_id, client_id, items, amount,
                                  amount_overridden, amount_paid, issue_date, due_date, status,
                                  last_reminder_sent, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (invoice_id) DO UPDATE SET
                items = EXCLUDED.items,
                amount = EXCLUDED.amount,
                amount_overridden = EXCLUDED.amount_overridden,
                amount_paid = EXCLUDED.amount_paid,
                issue_date = EXCLUDED.issue_date,
                due_date = EXCLUDED.due_date,
                status = EXCLUDED.status,
                last_reminder_sent = EXCLUDED.last_reminder_sent,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(invoice.invoice_id)
        .bind(invoice.booking_id)
        .bind(invoice.client_id)
        .bind(&invoice.items)
        .bind(invoice.amount)
        .bind(invoice.amount_overridden)
        .bind(invoice.amount_paid)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.status)
        .bind(invoice.last_reminder_sent)
        .bind(invoice.created_utc)
        .bind(invoice.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save invoice"))?;
        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn mark_reminder_sent(
        &mut self,
        invoice_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE invoices SET last_reminder_sent = $2 WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("mark reminder sent"))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete invoice"))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self, payment), fields(invoice_id = %payment.invoice_id))]
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_payment"])
            .start_timer();
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, invoice_id, payment_date, amount, account_id,
                                  method_notes, recorded_by, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.payment_id)
        .bind(payment.invoice_id)
        .bind(payment.payment_date)
        .bind(payment.amount)
        .bind(payment.account_id)
        .bind(&payment.method_notes)
        .bind(&payment.recorded_by)
        .bind(payment.created_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("insert payment"))?;
        timer.observe_duration();
        Ok(())
    }

    async fn list_payments(&mut self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY created_utc, payment_id"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list payments"))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn sum_payments(&mut self, invoice_id: Uuid) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sum_payments"])
            .start_timer();
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error("sum payments"))?;
        timer.observe_duration();
        Ok(total)
    }

    async fn delete_payments(&mut self, invoice_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM payments WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete payments"))?;
        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Editing statuses
    // -------------------------------------------------------------------------

    async fn get_editing_status(
        &mut self,
        status_id: Uuid,
    ) -> Result<Option<EditingStatus>, AppError> {
        let sql = format!("SELECT {STATUS_COLUMNS} FROM editing_statuses WHERE status_id = $1");
        sqlx::query_as::<_, EditingStatus>(&sql)
            .bind(status_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get editing status"))
    }

    async fn list_editing_statuses(&mut self) -> Result<Vec<EditingStatus>, AppError> {
        let sql = format!(
            "SELECT {STATUS_COLUMNS} FROM editing_statuses ORDER BY sort_order, created_utc"
        );
        sqlx::query_as::<_, EditingStatus>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list editing statuses"))
    }

    async fn save_editing_status(&mut self, status: &EditingStatus) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO editing_statuses (status_id, name, color, sort_order, stage, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (status_id) DO UPDATE SET
                name = EXCLUDED.name,
                color = EXCLUDED.color,
                sort_order = EXCLUDED.sort_order,
                stage = EXCLUDED.stage
            "#,
        )
        .bind(status.status_id)
        .bind(&status.name)
        .bind(&status.color)
        .bind(status.sort_order)
        .bind(&status.stage)
        .bind(status.created_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save editing status"))?;
        Ok(())
    }

    async fn delete_editing_status(&mut self, status_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM editing_statuses WHERE status_id = $1")
            .bind(status_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete editing status"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn editing_status_in_use(&mut self, status_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM editing_jobs WHERE status_id = $1)",
        )
        .bind(status_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error("check editing status usage"))
    }

    // -------------------------------------------------------------------------
    // Editing jobs
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn get_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM editing_jobs WHERE job_id = $1");
        sqlx::query_as::<_, EditingJob>(&sql)
            .bind(job_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get editing job"))
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn lock_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM editing_jobs WHERE job_id = $1 FOR UPDATE");
        sqlx::query_as::<_, EditingJob>(&sql)
            .bind(job_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("lock editing job"))
    }

    async fn get_editing_job_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<EditingJob>, AppError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM editing_jobs WHERE booking_id = $1");
        sqlx::query_as::<_, EditingJob>(&sql)
            .bind(booking_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error("get editing job for booking"))
    }

    #[instrument(skip(self, filter))]
    async fn list_editing_jobs(
        &mut self,
        filter: &EditingJobFilter,
    ) -> Result<Vec<EditingJob>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_editing_jobs"])
            .start_timer();
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM editing_jobs
            WHERE ($1::uuid IS NULL OR status_id = $1)
              AND ($2::uuid IS NULL OR editor_id = $2)
              AND ($3::uuid IS NULL OR client_id = $3)
            ORDER BY created_utc, job_id
            "#
        );
        let jobs = sqlx::query_as::<_, EditingJob>(&sql)
            .bind(filter.status_id)
            .bind(filter.editor_id)
            .bind(filter.client_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error("list editing jobs"))?;
        timer.observe_duration();
        Ok(jobs)
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    async fn save_editing_job(&mut self, job: &EditingJob) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_editing_job"])
            .start_timer();
        sqlx::query(
            r#"
            INSERT INTO editing_jobs (job_id, booking_id, client_id, editor_id, status_id,
                                      upload_date, drive_folder_url, photographer_notes,
                                      priority, revision_count, revision_notes,
                                      created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (job_id) DO UPDATE SET
                editor_id = EXCLUDED.editor_id,
                status_id = EXCLUDED.status_id,
                upload_date = EXCLUDED.upload_date,
                drive_folder_url = EXCLUDED.drive_folder_url,
                photographer_notes = EXCLUDED.photographer_notes,
                priority = EXCLUDED.priority,
                revision_count = EXCLUDED.revision_count,
                revision_notes = EXCLUDED.revision_notes,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(job.job_id)
        .bind(job.booking_id)
        .bind(job.client_id)
        .bind(job.editor_id)
        .bind(job.status_id)
        .bind(job.upload_date)
        .bind(&job.drive_folder_url)
        .bind(&job.photographer_notes)
        .bind(&job.priority)
        .bind(job.revision_count)
        .bind(&job.revision_notes)
        .bind(job.created_utc)
        .bind(job.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save editing job"))?;
        timer.observe_duration();
        Ok(())
    }

    async fn delete_editing_job(&mut self, job_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM editing_jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error("delete editing job"))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    async fn get_settings(&mut self) -> Result<StudioSettings, AppError> {
        let settings = sqlx::query_as::<_, StudioSettings>(
            "SELECT studio_name, automated_reminders_enabled, updated_utc FROM studio_settings WHERE id = 1",
        )
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error("get settings"))?;
        Ok(settings.unwrap_or_default())
    }

    async fn save_settings(&mut self, settings: &StudioSettings) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO studio_settings (id, studio_name, automated_reminders_enabled, updated_utc)
            VALUES (1, $1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                studio_name = EXCLUDED.studio_name,
                automated_reminders_enabled = EXCLUDED.automated_reminders_enabled,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(&settings.studio_name)
        .bind(settings.automated_reminders_enabled)
        .bind(settings.updated_utc)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error("save settings"))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })
    }
}

// src/db/invoice_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        booking::{PaymentMethod, PaymentStatus},
        invoice::{Invoice, InvoiceProduct, InvoiceTotals, NewInvoice},
        payment::LedgerInvoiceRow,
    },
};

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  FATURA
    // =========================================================================

    pub async fn create_invoice<'e, E>(&self, executor: E, new_invoice: &NewInvoice) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let t = &new_invoice.totals;
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                booking_id, customer_id, provider_id, customer_name, provider_name,
                service_amount, products_total, tax_rate, tax, discount, total_amount,
                advance_payment, balance_due, payment_method, payment_status,
                commission_type, commission_rate, commission_amount, net_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(new_invoice.booking_id)
        .bind(new_invoice.customer_id)
        .bind(new_invoice.provider_id)
        .bind(&new_invoice.customer_name)
        .bind(&new_invoice.provider_name)
        .bind(t.service_amount)
        .bind(t.products_total)
        .bind(t.tax_rate)
        .bind(t.tax)
        .bind(t.discount)
        .bind(t.total_amount)
        .bind(t.advance_payment)
        .bind(t.balance_due)
        .bind(new_invoice.payment_method)
        .bind(new_invoice.payment_status)
        .bind(new_invoice.commission.kind)
        .bind(new_invoice.commission.rate)
        .bind(t.commission_amount)
        .bind(t.net_amount)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("Esta reserva já possui fatura.".to_string());
                }
            }
            e.into()
        })?;

        Ok(invoice)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    // Trava a fatura durante uma edição (produtos ou pagamento)
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn find_by_booking<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn list_for_provider(&self, provider_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    pub async fn list_all(&self) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    pub async fn update_totals<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        totals: &InvoiceTotals,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET products_total = $2,
                tax = $3,
                discount = $4,
                total_amount = $5,
                advance_payment = $6,
                balance_due = $7,
                commission_amount = $8,
                net_amount = $9,
                payment_method = $10,
                payment_status = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(totals.products_total)
        .bind(totals.tax)
        .bind(totals.discount)
        .bind(totals.total_amount)
        .bind(totals.advance_payment)
        .bind(totals.balance_due)
        .bind(totals.commission_amount)
        .bind(totals.net_amount)
        .bind(payment_method)
        .bind(payment_status)
        .fetch_one(executor)
        .await?;
        Ok(invoice)
    }

    // =========================================================================
    //  PRODUTOS USADOS
    // =========================================================================

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, InvoiceProduct>(
            "SELECT * FROM invoice_products WHERE invoice_id = $1 ORDER BY created_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    pub async fn insert_product<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        name: &str,
        quantity: Decimal,
        rate: Decimal,
        total: Decimal,
    ) -> Result<InvoiceProduct, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, InvoiceProduct>(
            r#"
            INSERT INTO invoice_products (invoice_id, name, quantity, rate, total)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(name)
        .bind(quantity)
        .bind(rate)
        .bind(total)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        product_id: Uuid,
        name: &str,
        quantity: Decimal,
        rate: Decimal,
        total: Decimal,
    ) -> Result<Option<InvoiceProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, InvoiceProduct>(
            r#"
            UPDATE invoice_products
            SET name = $3, quantity = $4, rate = $5, total = $6
            WHERE id = $2 AND invoice_id = $1
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(product_id)
        .bind(name)
        .bind(quantity)
        .bind(rate)
        .bind(total)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn delete_product<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM invoice_products WHERE id = $2 AND invoice_id = $1")
            .bind(invoice_id)
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_products<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM invoice_products WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  EXTRATO
    // =========================================================================

    pub async fn ledger_rows<'e, E>(
        &self,
        executor: E,
        provider_id: Uuid,
    ) -> Result<Vec<LedgerInvoiceRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, LedgerInvoiceRow>(
            "SELECT net_amount, payment_status, payment_method FROM invoices WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}

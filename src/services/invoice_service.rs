// src/services/invoice_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{checked_product, ensure_storable, round_money},
    },
    db::{BookingRepository, InvoiceRepository, PaymentRepository, ProviderRepository, UserRepository},
    models::{
        auth::{Actor, UserRole},
        booking::{Booking, PaymentStatus},
        invoice::{
            Invoice, InvoiceDetail, InvoiceTotals, NewInvoice, ProductLineInput,
            UpdateInvoicePaymentPayload,
        },
        payment::EarningsSummary,
        provider::CommissionRule,
    },
};

/// Calcula todos os valores de uma fatura.
///
/// `tax = round2((serviço + produtos - desconto) * taxa / 100)` e
/// `total = serviço + produtos + tax - desconto`. A comissão sai do total,
/// o líquido é o total menos a comissão e o saldo devedor é o total menos o
/// adiantamento, que nunca pode ficar negativo.
pub fn compute_totals(
    service_amount: Decimal,
    products_total: Decimal,
    tax_rate: Decimal,
    discount: Decimal,
    advance_payment: Decimal,
    commission: CommissionRule,
) -> Result<InvoiceTotals, AppError> {
    ensure_storable(discount, "discount")?;
    ensure_storable(advance_payment, "advancePayment")?;
    if discount < Decimal::ZERO || advance_payment < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Desconto e adiantamento não podem ser negativos.".to_string(),
        ));
    }

    let gross = service_amount + products_total;
    if discount > gross {
        return Err(AppError::BadRequest(
            "O desconto não pode ser maior que o valor da fatura.".to_string(),
        ));
    }

    let taxable = gross - discount;
    let tax = round_money(taxable * tax_rate / Decimal::ONE_HUNDRED);
    let total_amount = ensure_storable(service_amount + products_total + tax - discount, "totalAmount")?;

    let balance_due = total_amount - advance_payment;
    if balance_due < Decimal::ZERO {
        return Err(AppError::Conflict(format!(
            "O adiantamento de {} excede o total da fatura ({}).",
            advance_payment, total_amount
        )));
    }

    let commission_amount = commission.commission_on(total_amount);

    Ok(InvoiceTotals {
        service_amount,
        products_total,
        tax_rate,
        tax,
        discount,
        total_amount,
        advance_payment,
        balance_due,
        commission_amount,
        net_amount: total_amount - commission_amount,
    })
}

// Total de uma linha de produto
fn product_line_total(line: &ProductLineInput) -> Result<Decimal, AppError> {
    if line.quantity <= Decimal::ZERO {
        return Err(AppError::BadRequest(format!(
            "Quantidade inválida para o produto '{}'.",
            line.name
        )));
    }
    if line.rate < Decimal::ZERO {
        return Err(AppError::BadRequest(format!(
            "Valor unitário inválido para o produto '{}'.",
            line.name
        )));
    }
    ensure_storable(line.quantity, "quantity")?;
    ensure_storable(line.rate, "rate")?;
    checked_product(line.quantity, line.rate, "total")
}

// Saques já feitos precisam continuar cobertos pelas faturas pagas
fn ensure_withdrawals_covered(summary: &EarningsSummary) -> Result<(), AppError> {
    if summary.available_balance < Decimal::ZERO {
        return Err(AppError::Conflict(format!(
            "O prestador já sacou contra esta fatura; o saldo ficaria em {}.",
            summary.available_balance
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InvoiceService {
    pool: PgPool,
    invoice_repo: InvoiceRepository,
    booking_repo: BookingRepository,
    user_repo: UserRepository,
    provider_repo: ProviderRepository,
    payment_repo: PaymentRepository,
    tax_rate: Decimal,
}

impl InvoiceService {
    pub fn new(
        pool: PgPool,
        invoice_repo: InvoiceRepository,
        booking_repo: BookingRepository,
        user_repo: UserRepository,
        provider_repo: ProviderRepository,
        payment_repo: PaymentRepository,
        tax_rate: Decimal,
    ) -> Self {
        Self { pool, invoice_repo, booking_repo, user_repo, provider_repo, payment_repo, tax_rate }
    }

    // =========================================================================
    //  GERAÇÃO (chamada na conclusão da reserva, dentro da mesma transação)
    // =========================================================================

    pub async fn generate_for_booking(
        &self,
        conn: &mut PgConnection,
        booking: &Booking,
    ) -> Result<Invoice, AppError> {
        let provider_id = booking.provider_id.ok_or_else(|| {
            AppError::Conflict("A reserva não possui prestador atribuído.".to_string())
        })?;

        let lines = self.booking_repo.list_services(&mut *conn, booking.id).await?;
        let service_amount = round_money(lines.iter().map(|line| line.line_total()).sum());

        let customer = self
            .user_repo
            .find_by_id(&mut *conn, booking.customer_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let provider = self
            .user_repo
            .find_by_id(&mut *conn, provider_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let commission = self
            .provider_repo
            .find_profile(&mut *conn, provider_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Perfil do prestador".to_string()))?
            .commission_rule();

        let totals = compute_totals(
            service_amount,
            Decimal::ZERO,
            self.tax_rate,
            Decimal::ZERO,
            Decimal::ZERO,
            commission,
        )?;

        let new_invoice = NewInvoice {
            booking_id: booking.id,
            customer_id: booking.customer_id,
            provider_id,
            customer_name: customer.name,
            provider_name: provider.name,
            payment_method: booking.payment_method,
            payment_status: booking.payment_status,
            commission,
            totals,
        };

        let invoice = self.invoice_repo.create_invoice(&mut *conn, &new_invoice).await?;
        self.sync_booking(&mut *conn, &invoice).await?;

        tracing::info!(
            "🧾 Fatura {} gerada para a reserva {} (total {})",
            invoice.id,
            booking.id,
            invoice.total_amount
        );

        Ok(invoice)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn get_invoice(&self, actor: &Actor, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let invoice = self
            .invoice_repo
            .find_by_id(&self.pool, invoice_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fatura".to_string()))?;
        ensure_visible(actor, &invoice)?;
        let mut conn = self.pool.acquire().await?;
        self.load_detail(&mut conn, invoice).await
    }

    pub async fn get_by_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let invoice = self
            .invoice_repo
            .find_by_booking(&self.pool, booking_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fatura".to_string()))?;
        ensure_visible(actor, &invoice)?;
        let mut conn = self.pool.acquire().await?;
        self.load_detail(&mut conn, invoice).await
    }

    pub async fn list_for_actor(&self, actor: &Actor) -> Result<Vec<Invoice>, AppError> {
        match actor.role {
            UserRole::Customer => self.invoice_repo.list_for_customer(actor.id).await,
            UserRole::Provider => self.invoice_repo.list_for_provider(actor.id).await,
            UserRole::Admin => self.invoice_repo.list_all().await,
        }
    }

    // =========================================================================
    //  PRODUTOS (prestador dono da fatura ou admin)
    // =========================================================================

    pub async fn add_product(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        line: &ProductLineInput,
    ) -> Result<InvoiceDetail, AppError> {
        let total = product_line_total(line)?;

        let mut tx = self.pool.begin().await?;
        let invoice = self.lock_for_edit(&mut tx, actor, invoice_id).await?;

        self.invoice_repo
            .insert_product(&mut *tx, invoice.id, line.name.trim(), line.quantity, line.rate, total)
            .await?;

        let detail = self.recompute(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        product_id: Uuid,
        line: &ProductLineInput,
    ) -> Result<InvoiceDetail, AppError> {
        let total = product_line_total(line)?;

        let mut tx = self.pool.begin().await?;
        let invoice = self.lock_for_edit(&mut tx, actor, invoice_id).await?;

        self.invoice_repo
            .update_product(&mut *tx, invoice.id, product_id, line.name.trim(), line.quantity, line.rate, total)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".to_string()))?;

        let detail = self.recompute(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn delete_product(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        product_id: Uuid,
    ) -> Result<InvoiceDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let invoice = self.lock_for_edit(&mut tx, actor, invoice_id).await?;

        if !self.invoice_repo.delete_product(&mut *tx, invoice.id, product_id).await? {
            return Err(AppError::ResourceNotFound("Produto".to_string()));
        }

        let detail = self.recompute(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Substitui a lista inteira de produtos.
    pub async fn replace_products(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        lines: &[ProductLineInput],
    ) -> Result<InvoiceDetail, AppError> {
        let totals = lines
            .iter()
            .map(product_line_total)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;
        let invoice = self.lock_for_edit(&mut tx, actor, invoice_id).await?;

        self.invoice_repo.delete_all_products(&mut *tx, invoice.id).await?;
        for (line, total) in lines.iter().zip(totals) {
            self.invoice_repo
                .insert_product(&mut *tx, invoice.id, line.name.trim(), line.quantity, line.rate, total)
                .await?;
        }

        let detail = self.recompute(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(detail)
    }

    // =========================================================================
    //  PAGAMENTO (admin)
    // =========================================================================

    pub async fn update_payment(
        &self,
        invoice_id: Uuid,
        payload: &UpdateInvoicePaymentPayload,
    ) -> Result<InvoiceDetail, AppError> {
        let provider_id = self
            .invoice_repo
            .find_by_id(&self.pool, invoice_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fatura".to_string()))?
            .provider_id;

        let mut tx = self.pool.begin().await?;

        // Mesma ordem de travas do pedido de saque: prestador, depois fatura
        self.provider_repo
            .lock_profile(&mut *tx, provider_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Perfil do prestador".to_string()))?;
        let invoice = self
            .invoice_repo
            .lock_by_id(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fatura".to_string()))?;

        let payment_method = payload.payment_method.unwrap_or(invoice.payment_method);
        let payment_status = payload.payment_status.unwrap_or(invoice.payment_status);
        let discount = payload.discount.unwrap_or(invoice.discount);
        let advance_payment = payload.advance_payment.unwrap_or(invoice.advance_payment);

        let totals = compute_totals(
            invoice.service_amount,
            invoice.products_total,
            invoice.tax_rate,
            discount,
            advance_payment,
            invoice.commission_rule(),
        )?;

        let updated = self
            .invoice_repo
            .update_totals(&mut *tx, invoice.id, &totals, payment_method, payment_status)
            .await?;
        self.sync_booking(&mut *tx, &updated).await?;

        let invoices = self.invoice_repo.ledger_rows(&mut *tx, provider_id).await?;
        let withdrawals = self.payment_repo.ledger_rows(&mut *tx, provider_id).await?;
        ensure_withdrawals_covered(&EarningsSummary::from_records(&invoices, &withdrawals))?;

        let detail = self.load_detail(&mut *tx, updated).await?;
        tx.commit().await?;

        tracing::info!(
            "💳 Pagamento da fatura {} atualizado para {:?}",
            detail.invoice.id,
            detail.invoice.payment_status
        );

        Ok(detail)
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    async fn lock_for_edit(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .invoice_repo
            .lock_by_id(&mut *conn, invoice_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fatura".to_string()))?;

        if !actor.is_admin() && invoice.provider_id != actor.id {
            return Err(AppError::Forbidden(
                "Somente o prestador da fatura pode alterar os produtos.".to_string(),
            ));
        }
        if invoice.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict("A fatura já foi paga e não pode ser alterada.".to_string()));
        }
        Ok(invoice)
    }

    // Recalcula tudo a partir dos produtos gravados
    async fn recompute(&self, conn: &mut PgConnection, invoice: &Invoice) -> Result<InvoiceDetail, AppError> {
        let products = self.invoice_repo.list_products(&mut *conn, invoice.id).await?;
        let products_total: Decimal = products.iter().map(|p| p.total).sum();

        let totals = compute_totals(
            invoice.service_amount,
            products_total,
            invoice.tax_rate,
            invoice.discount,
            invoice.advance_payment,
            invoice.commission_rule(),
        )?;

        let updated = self
            .invoice_repo
            .update_totals(&mut *conn, invoice.id, &totals, invoice.payment_method, invoice.payment_status)
            .await?;
        self.sync_booking(&mut *conn, &updated).await?;

        let services = self.booking_repo.list_services(&mut *conn, updated.booking_id).await?;
        Ok(InvoiceDetail { invoice: updated, services, products })
    }

    async fn sync_booking(&self, conn: &mut PgConnection, invoice: &Invoice) -> Result<(), AppError> {
        self.booking_repo
            .sync_financials(
                &mut *conn,
                invoice.booking_id,
                invoice.total_amount,
                invoice.commission_rate,
                invoice.commission_amount,
                invoice.payment_method,
                invoice.payment_status,
            )
            .await
    }

    async fn load_detail(&self, conn: &mut PgConnection, invoice: Invoice) -> Result<InvoiceDetail, AppError> {
        let services = self.booking_repo.list_services(&mut *conn, invoice.booking_id).await?;
        let products = self.invoice_repo.list_products(&mut *conn, invoice.id).await?;
        Ok(InvoiceDetail { invoice, services, products })
    }
}

// Fatura visível para o cliente, o prestador e o admin
fn ensure_visible(actor: &Actor, invoice: &Invoice) -> Result<(), AppError> {
    let visible = match actor.role {
        UserRole::Admin => true,
        UserRole::Customer => invoice.customer_id == actor.id,
        UserRole::Provider => invoice.provider_id == actor.id,
    };
    if visible {
        Ok(())
    } else {
        Err(AppError::Forbidden("Você não tem acesso a esta fatura.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ten_percent() -> CommissionRule {
        CommissionRule::percentage(d("10"))
    }

    #[test]
    fn reference_invoice_totals() {
        // [{price: 100, qty: 2, discount: 20}] => serviço 180
        let totals = compute_totals(d("180"), d("0"), d("18"), d("0"), d("0"), ten_percent()).unwrap();

        assert_eq!(totals.tax, d("32.40"));
        assert_eq!(totals.total_amount, d("212.40"));
        assert_eq!(totals.commission_amount, d("21.24"));
        assert_eq!(totals.net_amount, d("191.16"));
        assert_eq!(totals.balance_due, d("212.40"));
    }

    #[test]
    fn total_identity_holds() {
        let cases = [
            ("180", "60", "18", "15", "0"),
            ("99.99", "0.01", "18", "0", "50"),
            ("1234.56", "78.90", "5", "100", "0"),
            ("10", "0", "0", "10", "0"),
        ];
        for (service, products, rate, discount, advance) in cases {
            let t = compute_totals(d(service), d(products), d(rate), d(discount), d(advance), ten_percent())
                .unwrap();
            assert_eq!(t.total_amount, t.service_amount + t.products_total + t.tax - t.discount);
            assert_eq!(t.net_amount, t.total_amount - t.commission_amount);
            assert_eq!(t.balance_due, t.total_amount - t.advance_payment);
        }
    }

    #[test]
    fn tax_is_charged_after_discount() {
        let t = compute_totals(d("200"), d("0"), d("18"), d("50"), d("0"), ten_percent()).unwrap();
        assert_eq!(t.tax, d("27.00"));
        assert_eq!(t.total_amount, d("177.00"));
    }

    #[test]
    fn flat_commission_never_exceeds_total() {
        let t = compute_totals(d("10"), d("0"), d("0"), d("0"), d("0"), CommissionRule::flat(d("50"))).unwrap();
        assert_eq!(t.commission_amount, d("10"));
        assert_eq!(t.net_amount, d("0"));
    }

    #[test]
    fn advance_above_total_is_a_conflict() {
        let err = compute_totals(d("100"), d("0"), d("18"), d("0"), d("200"), ten_percent()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn discount_above_gross_is_rejected() {
        let err = compute_totals(d("100"), d("20"), d("18"), d("150"), d("0"), ten_percent()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn product_lines_need_positive_quantity() {
        let line = ProductLineInput { name: "Filtro".into(), quantity: d("0"), rate: d("30") };
        assert!(product_line_total(&line).is_err());

        let line = ProductLineInput { name: "Filtro".into(), quantity: d("1.5"), rate: d("33.33") };
        assert_eq!(product_line_total(&line).unwrap(), d("50.00"));
    }

    #[test]
    fn oversized_product_lines_are_bad_requests() {
        let line: ProductLineInput =
            serde_json::from_str(r#"{"name":"Filtro","quantity":1e15,"rate":1e15}"#).unwrap();
        assert!(matches!(product_line_total(&line), Err(AppError::BadRequest(_))));

        let line = ProductLineInput { name: "Filtro".into(), quantity: d("1"), rate: d("100000000000") };
        assert!(matches!(product_line_total(&line), Err(AppError::BadRequest(_))));

        // cada fator cabe na coluna, o produto não
        let line = ProductLineInput { name: "Filtro".into(), quantity: d("100000"), rate: d("1000000") };
        assert!(matches!(product_line_total(&line), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn oversized_payment_fields_are_bad_requests() {
        let err = compute_totals(d("100"), d("0"), d("18"), d("0"), d("10000000000"), ten_percent()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = compute_totals(d("9999999999"), d("9999999999"), d("18"), d("0"), d("0"), ten_percent()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn unpaying_a_withdrawn_invoice_is_a_conflict() {
        use crate::models::{
            booking::PaymentMethod,
            payment::{LedgerInvoiceRow, LedgerWithdrawalRow, WithdrawalStatus},
        };

        let withdrawn = [LedgerWithdrawalRow { amount: d("191.16"), status: WithdrawalStatus::Completed }];
        let paid = LedgerInvoiceRow {
            net_amount: d("191.16"),
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Cash,
        };
        let summary = EarningsSummary::from_records(&[paid.clone()], &withdrawn);
        assert!(ensure_withdrawals_covered(&summary).is_ok());

        let reverted = LedgerInvoiceRow { payment_status: PaymentStatus::Pending, ..paid };
        let summary = EarningsSummary::from_records(&[reverted], &withdrawn);
        assert!(matches!(ensure_withdrawals_covered(&summary), Err(AppError::Conflict(_))));
    }
}

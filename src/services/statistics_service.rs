// src/services/statistics_service.rs
//
// Motor de estadísticas. Resuelve el rango pedido (preset o fechas
// explícitas, nunca ambos), agrega ventas cobradas, devoluciones y
// gastos, y arma el desglose por día o por mes. Un rango sin actividad
// reporta "0.00" en todo, nunca null.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};

use crate::{
    common::{
        error::AppError,
        money::{quantize_money, quantize_quantity, zero_money},
    },
    db::{
        statistics_repo::{ProductReturnedRow, ProductSoldRow},
        CatalogRepository, ExpensesRepository, StatisticsRepository,
    },
    models::statistics::{PeriodBucket, ProductQuantity, StatisticsResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn trunc_unit(self) -> &'static str {
        match self {
            Granularity::Daily => "day",
            Granularity::Monthly => "month",
        }
    }

    pub fn format(self, bucket: DateTime<Utc>) -> String {
        match self {
            Granularity::Daily => bucket.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => bucket.format("%Y-%m").to_string(),
        }
    }
}

/// Rango semiabierto [start, end) ya resuelto, con la granularidad del
/// desglose: mensual solo para el preset anual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsQuery {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub product_slug: Option<String>,
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::Integrity(format!("fecha inválida {year}-{month}-{day}")))
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Formato de fecha inválido. Use YYYY-MM-DD.".into()))
}

/// Resuelve el selector de rango. Exactamente uno: preset nombrado o
/// par de fechas explícitas (ambas, inclusive en el fin).
pub fn resolve_range(
    period: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    today: NaiveDate,
) -> Result<ResolvedRange, AppError> {
    if period.is_some() && (start_date.is_some() || end_date.is_some()) {
        return Err(AppError::Validation(
            "Indique un período o un rango de fechas, no ambos.".into(),
        ));
    }

    if let Some(period) = period {
        let (start, end, granularity) = match period {
            "today" => (today, today + Duration::days(1), Granularity::Daily),
            "week" => {
                // La semana arranca el lunes.
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7), Granularity::Daily)
            }
            "month" => {
                let first = ymd(today.year(), today.month(), 1)?;
                let next = if today.month() == 12 {
                    ymd(today.year() + 1, 1, 1)?
                } else {
                    ymd(today.year(), today.month() + 1, 1)?
                };
                (first, next, Granularity::Daily)
            }
            "year" => {
                let first = ymd(today.year(), 1, 1)?;
                (first, ymd(today.year() + 1, 1, 1)?, Granularity::Monthly)
            }
            _ => {
                return Err(AppError::Validation(
                    "Período inválido. Use today, week, month o year.".into(),
                ));
            }
        };
        return Ok(ResolvedRange {
            start: at_midnight(start),
            end: at_midnight(end),
            granularity,
        });
    }

    let (Some(start_raw), Some(end_raw)) = (start_date, end_date) else {
        return Err(AppError::Validation(
            "Debe indicar un período o un rango de fechas completo.".into(),
        ));
    };

    let start = parse_date(start_raw)?;
    let end = parse_date(end_raw)?;
    if start > end {
        return Err(AppError::Validation(
            "La fecha de inicio no puede ser posterior a la fecha de fin.".into(),
        ));
    }

    Ok(ResolvedRange {
        start: at_midnight(start),
        end: at_midnight(end + Duration::days(1)),
        granularity: Granularity::Daily,
    })
}

/// Cantidades netas por producto: vendido menos devuelto.
fn net_quantities(
    sold: Vec<ProductSoldRow>,
    returned: &[ProductReturnedRow],
) -> Vec<ProductQuantity> {
    sold.into_iter()
        .map(|row| {
            let returned_qty = returned
                .iter()
                .find(|r| r.product_id == row.product_id)
                .map(|r| r.quantity)
                .unwrap_or(Decimal::ZERO);
            ProductQuantity {
                product_name: row.product_name,
                product_slug: row.product_slug,
                total_quantity_sold: quantize_quantity(row.quantity - returned_qty),
            }
        })
        .collect()
}

fn top_products(mut nets: Vec<ProductQuantity>, limit: usize) -> Vec<ProductQuantity> {
    nets.retain(|p| p.total_quantity_sold > Decimal::ZERO);
    nets.sort_by(|a, b| b.total_quantity_sold.cmp(&a.total_quantity_sold));
    nets.truncate(limit);
    nets
}

/// Mezcla los tres orígenes en un desglose por período. Solo aparecen
/// los períodos con alguna actividad.
pub fn merge_breakdown(
    granularity: Granularity,
    sales: &[(DateTime<Utc>, i64, Decimal, Decimal)],
    returns: &[(DateTime<Utc>, Decimal)],
    expenses: &[(DateTime<Utc>, Decimal)],
) -> Vec<PeriodBucket> {
    let mut buckets: BTreeMap<String, PeriodBucket> = BTreeMap::new();

    let empty = |period: String| PeriodBucket {
        period,
        sales_count: 0,
        total_sales: zero_money(),
        total_collected: zero_money(),
        total_returns: zero_money(),
        total_expenses: zero_money(),
        profit: zero_money(),
    };

    for (bucket, count, total, collected) in sales {
        let key = granularity.format(*bucket);
        let entry = buckets.entry(key.clone()).or_insert_with(|| empty(key));
        entry.sales_count = *count;
        entry.total_sales = quantize_money(*total);
        entry.total_collected = quantize_money(*collected);
    }
    for (bucket, amount) in returns {
        let key = granularity.format(*bucket);
        let entry = buckets.entry(key.clone()).or_insert_with(|| empty(key));
        entry.total_returns = quantize_money(*amount);
    }
    for (bucket, amount) in expenses {
        let key = granularity.format(*bucket);
        let entry = buckets.entry(key.clone()).or_insert_with(|| empty(key));
        entry.total_expenses = quantize_money(*amount);
    }

    buckets
        .into_values()
        .map(|mut b| {
            b.profit = quantize_money(b.total_collected - b.total_returns - b.total_expenses);
            b
        })
        .collect()
}

#[derive(Clone)]
pub struct StatisticsService {
    statistics_repo: StatisticsRepository,
    expenses_repo: ExpensesRepository,
    catalog_repo: CatalogRepository,
}

impl StatisticsService {
    pub fn new(
        statistics_repo: StatisticsRepository,
        expenses_repo: ExpensesRepository,
        catalog_repo: CatalogRepository,
    ) -> Self {
        Self {
            statistics_repo,
            expenses_repo,
            catalog_repo,
        }
    }

    pub async fn compute<'a, A>(
        &self,
        conn: A,
        query: &StatisticsQuery,
    ) -> Result<StatisticsResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let range = resolve_range(
            query.period.as_deref(),
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            Utc::now().date_naive(),
        )?;

        let mut conn = conn.acquire().await?;

        let totals = self
            .statistics_repo
            .sales_totals(&mut *conn, range.start, range.end)
            .await?;
        let total_returns = self
            .statistics_repo
            .returns_total(&mut *conn, range.start, range.end)
            .await?;
        let total_expenses = self
            .expenses_repo
            .sum_between(&mut *conn, range.start, range.end)
            .await?;

        let total_collected = quantize_money(totals.total_collected);
        let total_returns = quantize_money(total_returns);
        let total_expenses = quantize_money(total_expenses);
        let total_profit = quantize_money(total_collected - total_returns - total_expenses);

        let sold = self
            .statistics_repo
            .sold_by_product(&mut *conn, range.start, range.end)
            .await?;
        let returned = self
            .statistics_repo
            .returned_by_product(&mut *conn, range.start, range.end)
            .await?;
        let nets = net_quantities(sold, &returned);

        let (most_sold_products, product) = match &query.product_slug {
            Some(slug) => {
                let product = self
                    .catalog_repo
                    .get_product_by_slug(&mut *conn, slug)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;
                let net = nets
                    .into_iter()
                    .find(|p| p.product_slug == product.slug)
                    .unwrap_or(ProductQuantity {
                        product_name: product.name,
                        product_slug: product.slug,
                        total_quantity_sold: quantize_quantity(Decimal::ZERO),
                    });
                (None, Some(net))
            }
            None => (Some(top_products(nets, 5)), None),
        };

        let sales_buckets = self
            .statistics_repo
            .sales_by_bucket(&mut *conn, range.start, range.end, range.granularity.trunc_unit())
            .await?;
        let returns_buckets = self
            .statistics_repo
            .returns_by_bucket(&mut *conn, range.start, range.end, range.granularity.trunc_unit())
            .await?;
        let expenses_buckets = self
            .expenses_repo
            .amounts_by_bucket(&mut *conn, range.start, range.end, range.granularity.trunc_unit())
            .await?;

        let breakdown = merge_breakdown(
            range.granularity,
            &sales_buckets
                .iter()
                .map(|r| (r.bucket, r.sales_count, r.total_sales, r.total_collected))
                .collect::<Vec<_>>(),
            &returns_buckets
                .iter()
                .map(|r| (r.bucket, r.amount))
                .collect::<Vec<_>>(),
            &expenses_buckets
                .iter()
                .map(|r| (r.bucket, r.amount))
                .collect::<Vec<_>>(),
        );

        Ok(StatisticsResponse {
            total_sales_count: totals.sales_count,
            total_sales: quantize_money(totals.total_sales),
            total_collected,
            total_returns,
            total_expenses,
            total_profit,
            most_sold_products,
            product,
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn preset_today_cubre_el_dia_completo() {
        let range = resolve_range(Some("today"), None, None, today()).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2026-08-25T00:00:00+00:00");
        assert_eq!(range.end - range.start, Duration::days(1));
        assert_eq!(range.granularity, Granularity::Daily);
    }

    #[test]
    fn preset_week_arranca_el_lunes() {
        // El 2026-08-25 es martes; la semana va del lunes 24 al lunes 31.
        let range = resolve_range(Some("week"), None, None, today()).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2026-08-24T00:00:00+00:00");
        assert_eq!(range.end - range.start, Duration::days(7));
    }

    #[test]
    fn preset_month_cubre_el_mes_calendario() {
        let range = resolve_range(Some("month"), None, None, today()).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2026-08-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2026-09-01T00:00:00+00:00");
        assert_eq!(range.granularity, Granularity::Daily);
    }

    #[test]
    fn preset_year_desglosa_por_mes() {
        let range = resolve_range(Some("year"), None, None, today()).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2027-01-01T00:00:00+00:00");
        assert_eq!(range.granularity, Granularity::Monthly);
    }

    #[test]
    fn rango_explicito_incluye_la_fecha_de_fin() {
        let range =
            resolve_range(None, Some("2026-08-01"), Some("2026-08-10"), today()).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2026-08-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2026-08-11T00:00:00+00:00");
        assert_eq!(range.granularity, Granularity::Daily);
    }

    #[test]
    fn selector_de_rango_es_exactamente_uno() {
        assert!(resolve_range(None, None, None, today()).is_err());
        assert!(resolve_range(Some("today"), Some("2026-08-01"), None, today()).is_err());
        assert!(resolve_range(None, Some("2026-08-01"), None, today()).is_err());
    }

    #[test]
    fn formato_de_fecha_invalido_se_rechaza() {
        let err =
            resolve_range(None, Some("25/08/2026"), Some("2026-08-26"), today()).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn inicio_posterior_al_fin_se_rechaza() {
        assert!(resolve_range(None, Some("2026-08-10"), Some("2026-08-01"), today()).is_err());
    }

    #[test]
    fn periodo_desconocido_se_rechaza() {
        assert!(resolve_range(Some("fortnight"), None, None, today()).is_err());
    }

    #[test]
    fn desglose_mezcla_origenes_y_calcula_ganancia() {
        let day = "2026-08-25T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let other = "2026-08-26T00:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let breakdown = merge_breakdown(
            Granularity::Daily,
            &[(day, 3, dec!(300), dec!(250))],
            &[(day, dec!(50))],
            &[(other, dec!(40))],
        );

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].period, "2026-08-25");
        assert_eq!(breakdown[0].sales_count, 3);
        assert_eq!(breakdown[0].profit.to_string(), "200.00");
        // El 26 solo hubo gastos: la ganancia es negativa.
        assert_eq!(breakdown[1].period, "2026-08-26");
        assert_eq!(breakdown[1].profit.to_string(), "-40.00");
    }

    #[test]
    fn desglose_mensual_usa_clave_ano_mes() {
        let month = "2026-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let breakdown = merge_breakdown(
            Granularity::Monthly,
            &[(month, 1, dec!(100), dec!(100))],
            &[],
            &[],
        );
        assert_eq!(breakdown[0].period, "2026-03");
    }

    #[test]
    fn top_de_productos_es_neto_y_descendente() {
        let sold = vec![
            ProductSoldRow {
                product_id: Uuid::new_v4(),
                product_name: "Pan".into(),
                product_slug: "pan".into(),
                quantity: dec!(10),
            },
            ProductSoldRow {
                product_id: Uuid::nil(),
                product_name: "Factura".into(),
                product_slug: "factura".into(),
                quantity: dec!(8),
            },
        ];
        let returned = vec![ProductReturnedRow {
            product_id: Uuid::nil(),
            quantity: dec!(5),
        }];

        let top = top_products(net_quantities(sold, &returned), 5);
        assert_eq!(top[0].product_slug, "pan");
        assert_eq!(top[0].total_quantity_sold.to_string(), "10.000");
        assert_eq!(top[1].total_quantity_sold.to_string(), "3.000");
    }

    #[test]
    fn producto_totalmente_devuelto_no_aparece_en_el_top() {
        let sold = vec![ProductSoldRow {
            product_id: Uuid::nil(),
            product_name: "Pan".into(),
            product_slug: "pan".into(),
            quantity: dec!(4),
        }];
        let returned = vec![ProductReturnedRow {
            product_id: Uuid::nil(),
            quantity: dec!(4),
        }];
        assert!(top_products(net_quantities(sold, &returned), 5).is_empty());
    }
}

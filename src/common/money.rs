// src/common/money.rs

use rust_decimal::Decimal;

// Los montos se guardan como NUMERIC(10, 2) y las cantidades como
// NUMERIC(10, 3); estas funciones fijan la escala para que un cero
// serialice "0.00" y no "0".

/// Redondea a 2 decimales (plata).
pub fn quantize_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Redondea a 3 decimales (cantidades).
pub fn quantize_quantity(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(3);
    rounded.rescale(3);
    rounded
}

/// Cero con escala de plata.
pub fn zero_money() -> Decimal {
    quantize_money(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quantize_money_fija_dos_decimales() {
        assert_eq!(quantize_money(dec!(20)).to_string(), "20.00");
        assert_eq!(quantize_money(dec!(10.555)).to_string(), "10.56");
        assert_eq!(quantize_money(dec!(0)).to_string(), "0.00");
    }

    #[test]
    fn quantize_quantity_fija_tres_decimales() {
        assert_eq!(quantize_quantity(dec!(1)).to_string(), "1.000");
        assert_eq!(quantize_quantity(dec!(2.5)).to_string(), "2.500");
    }

    #[test]
    fn zero_money_serializa_cero_con_centavos() {
        assert_eq!(zero_money().to_string(), "0.00");
    }
}

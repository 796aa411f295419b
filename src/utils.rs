use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

/// 计算从 buy_price 到 sell_price 的百分比差异
///
/// buy_price 为零时返回 0，不做除法
pub fn calculate_percentage_difference(buy_price: &BigDecimal, sell_price: &BigDecimal) -> f64 {
    if buy_price.is_zero() {
        return 0.0;
    }

    let diff = sell_price - buy_price;
    let percentage = (&diff / buy_price) * BigDecimal::from(100);

    percentage.to_f64().unwrap_or(0.0)
}

/// 格式化价格：去掉末尾多余的零，不使用科学计数法
pub fn format_price(price: &BigDecimal) -> String {
    let normalized = price.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    if scale < 0 {
        normalized.with_scale(0).to_string()
    } else {
        normalized.to_string()
    }
}

/// ROI 保留两位小数
pub fn format_roi(roi_percent: f64) -> String {
    format!("{:.2}%", roi_percent)
}

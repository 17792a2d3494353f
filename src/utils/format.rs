/// Render a calendar field, zero-padding single digits (e.g., 5 -> "05", 0 -> "00")
pub fn pad_field(value: i64) -> String {
    if (0..10).contains(&value) {
        format!("0{}", value)
    } else {
        value.to_string()
    }
}

/// Labels used for the `{a}` placeholder, Sunday first
#[derive(Clone, Debug, Default, PartialEq)]
pub enum WeekdayNames {
    /// 日 一 二 三 四 五 六
    #[default]
    Chinese,
    /// Sun Mon Tue Wed Thu Fri Sat
    English,
    Custom([String; 7]),
}

const CHINESE_WEEKDAYS: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];
const ENGLISH_WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

impl WeekdayNames {
    /// Label for a weekday index where 0 is Sunday; out of range wraps
    pub fn label(&self, days_from_sunday: u32) -> &str {
        let idx = (days_from_sunday % 7) as usize;
        match self {
            WeekdayNames::Chinese => CHINESE_WEEKDAYS[idx],
            WeekdayNames::English => ENGLISH_WEEKDAYS[idx],
            WeekdayNames::Custom(names) => &names[idx],
        }
    }
}

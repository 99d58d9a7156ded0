//! Period Label Parser
//!
//! 期間列のヘッダー文字列（`Q1 FY23`、`Q1-FY2023`、`FY29`、`All Periods`）を
//! 四半期と会計年度に分解します。解析は純粋かつ全域的で、失敗しません。

use std::sync::OnceLock;

use regex::Regex;

/// 通期（四半期なし）を表す四半期値
pub const ALL_PERIODS: &str = "All Periods";

/// 解析済みの期間ラベル
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeriodLabel {
    /// `Q{n} FY{yy}` 形式
    Quarter { quarter: u8, fiscal_year: String },

    /// `FY{yy}` 形式（四半期は `All Periods`）
    FiscalYear { fiscal_year: String },

    /// リテラル `All Periods`（年度なし）
    AllPeriods,

    /// 期間として解釈できない列
    NotPeriod,
}

fn quarter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^Q([1-4])\s*-?\s*FY(\d{4}|\d{2})$").expect("Hardcode regex pattern")
    })
}

fn fiscal_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^FY(\d{4}|\d{2})$").expect("Hardcode regex pattern"))
}

/// 2桁の年度を21世紀として4桁に展開
fn expand_year(digits: &str) -> String {
    if digits.len() == 2 {
        format!("20{}", digits)
    } else {
        digits.to_string()
    }
}

impl PeriodLabel {
    /// ヘッダー文字列を解析
    ///
    /// 大文字・小文字は区別しません。3桁や5桁以上の年度（例: `FY100`）は
    /// 曖昧なため期間として扱いません。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxmelt::PeriodLabel;
    ///
    /// let label = PeriodLabel::parse("Q2-FY2023");
    /// assert_eq!(label.quarter().as_deref(), Some("Q2"));
    /// assert_eq!(label.fiscal_year(), Some("2023"));
    ///
    /// let label = PeriodLabel::parse("FY29");
    /// assert_eq!(label.quarter().as_deref(), Some("All Periods"));
    /// assert_eq!(label.fiscal_year(), Some("2029"));
    /// ```
    pub fn parse(label: &str) -> Self {
        let label = label.trim();

        if let Some(caps) = quarter_pattern().captures(label) {
            let quarter = caps[1].parse::<u8>().unwrap_or_default();
            return PeriodLabel::Quarter {
                quarter,
                fiscal_year: expand_year(&caps[2]),
            };
        }

        if let Some(caps) = fiscal_year_pattern().captures(label) {
            return PeriodLabel::FiscalYear {
                fiscal_year: expand_year(&caps[1]),
            };
        }

        if label.eq_ignore_ascii_case(ALL_PERIODS) {
            return PeriodLabel::AllPeriods;
        }

        PeriodLabel::NotPeriod
    }

    /// 期間として解釈できたかどうか
    pub fn is_period(&self) -> bool {
        !matches!(self, PeriodLabel::NotPeriod)
    }

    /// 四半期（`Q1`〜`Q4`、または `All Periods`）
    pub fn quarter(&self) -> Option<String> {
        match self {
            PeriodLabel::Quarter { quarter, .. } => Some(format!("Q{}", quarter)),
            PeriodLabel::FiscalYear { .. } | PeriodLabel::AllPeriods => {
                Some(ALL_PERIODS.to_string())
            }
            PeriodLabel::NotPeriod => None,
        }
    }

    /// 4桁の会計年度
    pub fn fiscal_year(&self) -> Option<&str> {
        match self {
            PeriodLabel::Quarter { fiscal_year, .. } | PeriodLabel::FiscalYear { fiscal_year } => {
                Some(fiscal_year)
            }
            PeriodLabel::AllPeriods | PeriodLabel::NotPeriod => None,
        }
    }
}

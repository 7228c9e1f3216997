use super::customer::Customer;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const POPULAR_SERVICES_LIMIT: usize = 10;
const BIRTHDAY_HORIZON_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularService {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBirthday {
    pub name: String,
    pub birthday: NaiveDate,
    pub mobile: String,
}

/// Dashboard figures derived from the local customer list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub today_customers: u32,
    pub today_revenue: f64,
    pub weekly_customers: u32,
    pub weekly_revenue: f64,
    pub monthly_customers: u32,
    pub monthly_revenue: f64,
    pub popular_services: Vec<PopularService>,
    pub upcoming_birthdays: Vec<UpcomingBirthday>,
}

impl AnalyticsSnapshot {
    pub fn compute(customers: &[Customer], today: NaiveDate) -> Self {
        let week_start = today - Duration::days(7);
        let month_start = today - Duration::days(30);

        let mut snapshot = AnalyticsSnapshot::default();
        let mut service_counts: HashMap<&str, u32> = HashMap::new();

        for customer in customers {
            if customer.visit_date >= today {
                snapshot.today_customers += 1;
                snapshot.today_revenue += customer.payment_amount;
            }
            if customer.visit_date >= week_start {
                snapshot.weekly_customers += 1;
                snapshot.weekly_revenue += customer.payment_amount;
            }
            if customer.visit_date >= month_start {
                snapshot.monthly_customers += 1;
                snapshot.monthly_revenue += customer.payment_amount;
            }
            for service in &customer.services {
                *service_counts.entry(service.as_str()).or_insert(0) += 1;
            }
            if let Some(birthday) = customer.birthday {
                if days_until_birthday(birthday, today) <= BIRTHDAY_HORIZON_DAYS {
                    snapshot.upcoming_birthdays.push(UpcomingBirthday {
                        name: customer.name.clone(),
                        birthday,
                        mobile: customer.mobile.clone(),
                    });
                }
            }
        }

        let mut popular: Vec<PopularService> = service_counts
            .into_iter()
            .map(|(name, count)| PopularService {
                name: name.to_string(),
                count,
            })
            .collect();
        popular.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        popular.truncate(POPULAR_SERVICES_LIMIT);
        snapshot.popular_services = popular;

        snapshot
    }
}

/// A snapshot as held in the single-row cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot {
    pub snapshot: AnalyticsSnapshot,
    pub cached_at: DateTime<Utc>,
}

impl CachedSnapshot {
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.cached_at <= max_age
    }
}

fn days_until_birthday(birthday: NaiveDate, today: NaiveDate) -> i64 {
    let this_year = anniversary(birthday, today.year());
    let next = if this_year < today {
        anniversary(birthday, today.year() + 1)
    } else {
        this_year
    };
    (next - today).num_days()
}

// Feb 29 birthdays land on Feb 28 in common years.
fn anniversary(birthday: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day() - 1))
        .unwrap_or(birthday)
}

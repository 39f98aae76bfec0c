//! Post-fetch filtering shared by every adapter and the multi-supplier merge.
//!
//! Remote results are cached per destination and stay only, so price and
//! rating filters run here on every call rather than upstream.

use staylink_core::{HotelSummary, SortBy, SupplierSearchParams};
use std::cmp::Ordering;

pub fn apply(hotels: Vec<HotelSummary>, params: &SupplierSearchParams) -> Vec<HotelSummary> {
    let mut hotels: Vec<HotelSummary> = hotels.into_iter().filter(|hotel| matches(hotel, params)).collect();
    sort(&mut hotels, params.sort_by);
    hotels.truncate(params.limit);
    hotels
}

pub fn matches(hotel: &HotelSummary, params: &SupplierSearchParams) -> bool {
    if let Some(min) = params.min_price {
        if hotel.starting_price < min {
            return false;
        }
    }
    if let Some(max) = params.max_price {
        if hotel.starting_price > max {
            return false;
        }
    }
    if let Some(min_rating) = params.min_rating {
        if hotel.star_rating < min_rating {
            return false;
        }
    }
    true
}

/// Stable sort; rating order breaks ties on review score, then price.
pub fn sort(hotels: &mut [HotelSummary], sort_by: SortBy) {
    match sort_by {
        SortBy::PriceAsc => hotels.sort_by(|a, b| a.starting_price.cmp(&b.starting_price)),
        SortBy::PriceDesc => hotels.sort_by(|a, b| b.starting_price.cmp(&a.starting_price)),
        SortBy::Rating => hotels.sort_by(|a, b| {
            b.star_rating
                .total_cmp(&a.star_rating)
                .then_with(|| compare_review_scores(b.review_score, a.review_score))
                .then_with(|| a.starting_price.cmp(&b.starting_price))
        }),
    }
}

fn compare_review_scores(a: Option<f32>, b: Option<f32>) -> Ordering {
    a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use staylink_core::{Location, StayQuery, SupplierCode};

    fn hotel(name: &str, price: i64, stars: f32) -> HotelSummary {
        HotelSummary {
            id: name.to_lowercase(),
            slug: name.to_lowercase(),
            supplier: SupplierCode::Local,
            name: name.to_string(),
            location: Location::default(),
            star_rating: stars,
            review_score: None,
            review_count: 0,
            currency: "EUR".to_string(),
            starting_price: Decimal::from(price),
            cheapest_rate_plan_id: None,
            thumbnail: None,
        }
    }

    fn params() -> SupplierSearchParams {
        let stay = StayQuery::default_from(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        SupplierSearchParams::new("Lisbon", stay)
    }

    fn names(hotels: &[HotelSummary]) -> Vec<&str> {
        hotels.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let mut params = params();
        params.min_price = Some(Decimal::from(100));
        params.max_price = Some(Decimal::from(200));

        let result = apply(
            vec![hotel("Cheap", 99, 3.0), hotel("Low", 100, 3.0), hotel("High", 200, 3.0), hotel("Lux", 201, 5.0)],
            &params,
        );
        assert_eq!(names(&result), vec!["Low", "High"]);
    }

    #[test]
    fn test_min_rating_and_rating_sort() {
        let mut params = params();
        params.min_rating = Some(4.0);
        params.sort_by = SortBy::Rating;

        let result = apply(
            vec![hotel("Three", 80, 3.0), hotel("Four", 120, 4.0), hotel("Five", 300, 5.0)],
            &params,
        );
        assert_eq!(names(&result), vec!["Five", "Four"]);
    }

    #[test]
    fn test_sort_desc_and_limit() {
        let mut params = params();
        params.sort_by = SortBy::PriceDesc;
        params.limit = 2;

        let result = apply(vec![hotel("A", 100, 3.0), hotel("B", 300, 3.0), hotel("C", 200, 3.0)], &params);
        assert_eq!(names(&result), vec!["B", "C"]);
    }
}

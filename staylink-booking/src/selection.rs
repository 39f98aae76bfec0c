use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staylink_catalog::SupplierRegistry;
use staylink_core::pricing::round_money;
use staylink_core::{AddOn, AddOnPricing, HotelSummary, RatePlan, RoomType, StayQuery, SupplierCode};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOnSelection {
    pub add_on_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// What the guest picked on the hotel page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    #[serde(default)]
    pub supplier: Option<SupplierCode>,
    pub hotel_id: String,
    pub room_type_id: String,
    pub rate_plan_id: String,
    #[serde(flatten)]
    pub stay: StayQuery,
    #[serde(default)]
    pub add_ons: Vec<AddOnSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAddOn {
    pub id: String,
    pub name: String,
    pub pricing: AddOnPricing,
    pub included: bool,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPricing {
    pub currency: String,
    pub room_subtotal: Decimal,
    pub taxes: Decimal,
    pub fees: Decimal,
    pub add_ons_total: Decimal,
    pub grand_total: Decimal,
}

/// Priced selection handed to checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSelection {
    pub supplier: SupplierCode,
    pub hotel: HotelSummary,
    pub room_type: RoomType,
    pub rate_plan: RatePlan,
    pub stay: StayQuery,
    pub nights: u32,
    pub add_ons: Vec<SelectedAddOn>,
    pub pricing: SelectionPricing,
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Hotel not found: {0}")]
    HotelNotFound(String),

    #[error("Invalid selection: {0}")]
    Invalid(String),
}

/// Builds a priced booking selection from the live offer of the supplier of record.
pub struct SelectionAssembler {
    registry: Arc<SupplierRegistry>,
}

impl SelectionAssembler {
    pub fn new(registry: Arc<SupplierRegistry>) -> Self {
        Self { registry }
    }

    pub async fn assemble(&self, request: &SelectionRequest) -> Result<BookingSelection, SelectionError> {
        let stay = &request.stay;
        stay.validate().map_err(|e| SelectionError::Invalid(e.to_string()))?;
        if request.add_ons.iter().any(|a| a.quantity == 0) {
            return Err(SelectionError::Invalid("add-on quantity must be at least 1".to_string()));
        }

        let adapter = self.registry.get_adapter(request.supplier);
        let details = adapter
            .get_hotel_details(&request.hotel_id, Some(stay))
            .await
            .ok_or_else(|| SelectionError::HotelNotFound(request.hotel_id.clone()))?;

        let room = details
            .find_room(&request.room_type_id)
            .ok_or_else(|| SelectionError::Invalid(format!("Room type {} not found", request.room_type_id)))?;
        let plan = room
            .rate_plans
            .iter()
            .find(|plan| plan.id == request.rate_plan_id)
            .ok_or_else(|| SelectionError::Invalid(format!("Rate plan {} not found for this room", request.rate_plan_id)))?;

        check_capacity(room, stay)?;
        if plan.available_rooms < stay.rooms {
            return Err(SelectionError::Invalid(format!(
                "Only {} room(s) left at this rate",
                plan.available_rooms
            )));
        }

        let nights = stay.nights().max(1) as u32;
        let add_ons = request
            .add_ons
            .iter()
            .map(|selection| {
                let add_on = details
                    .add_ons
                    .iter()
                    .chain(plan.add_ons.iter())
                    .find(|a| a.id == selection.add_on_id)
                    .ok_or_else(|| SelectionError::Invalid(format!("Add-on {} is not offered", selection.add_on_id)))?;
                Ok(select_add_on(add_on, selection.quantity, nights, stay.guests()))
            })
            .collect::<Result<Vec<_>, SelectionError>>()?;

        let pricing = price(plan, &add_ons);
        debug!(
            hotel_id = %request.hotel_id,
            rate_plan_id = %plan.id,
            grand_total = %pricing.grand_total,
            "Selection assembled"
        );

        let mut room_type = room.clone();
        room_type.rate_plans.clear();

        Ok(BookingSelection {
            supplier: plan.supplier,
            hotel: details.summary.clone(),
            room_type,
            rate_plan: plan.clone(),
            stay: stay.clone(),
            nights,
            add_ons,
            pricing,
        })
    }
}

fn check_capacity(room: &RoomType, stay: &StayQuery) -> Result<(), SelectionError> {
    let rooms = stay.rooms.max(1);
    let max_adults = room.max_adults.saturating_mul(rooms);
    if stay.adults > max_adults {
        return Err(SelectionError::Invalid(format!(
            "{} adults exceed the limit of {} for {} room(s)",
            stay.adults, max_adults, rooms
        )));
    }
    let max_children = room.max_children.saturating_mul(rooms);
    if stay.children > max_children {
        return Err(SelectionError::Invalid(format!(
            "{} children exceed the limit of {} for {} room(s)",
            stay.children, max_children, rooms
        )));
    }
    if !room.fits(stay.adults, stay.children, rooms) {
        return Err(SelectionError::Invalid(format!(
            "{} guests exceed the occupancy of {} room(s)",
            stay.guests(),
            rooms
        )));
    }
    Ok(())
}

fn select_add_on(add_on: &AddOn, quantity: u32, nights: u32, guests: u32) -> SelectedAddOn {
    SelectedAddOn {
        id: add_on.id.clone(),
        name: add_on.name.clone(),
        pricing: add_on.pricing,
        included: add_on.included,
        quantity,
        unit_price: if add_on.included { Decimal::ZERO } else { add_on.price },
        total: round_money(add_on.total_for(quantity, nights, guests)),
    }
}

/// Taxes and fees are rounded first and the room subtotal takes the remainder,
/// so the parts always add up to the rate's charged total.
fn price(plan: &RatePlan, add_ons: &[SelectedAddOn]) -> SelectionPricing {
    let room_nights = Decimal::from(plan.nights) * Decimal::from(plan.rooms);
    let total = round_money(plan.total_amount);
    let taxes = round_money(plan.taxes * room_nights);
    let fees = round_money(plan.fees * Decimal::from(plan.rooms));
    let add_ons_total: Decimal = add_ons.iter().map(|a| a.total).sum();

    SelectionPricing {
        currency: plan.currency.clone(),
        room_subtotal: total - taxes - fees,
        taxes,
        fees,
        add_ons_total,
        grand_total: total + add_ons_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use staylink_catalog::test_support::sample_inventory;
    use staylink_catalog::LocalAdapter;

    fn assembler() -> SelectionAssembler {
        let local = Arc::new(LocalAdapter::new(Arc::new(sample_inventory())));
        SelectionAssembler::new(Arc::new(SupplierRegistry::new(local)))
    }

    fn request(room: &str, plan: &str, adults: u32, children: u32, rooms: u32) -> SelectionRequest {
        let check_in = NaiveDate::from_ymd_opt(2026, 11, 10).unwrap();
        SelectionRequest {
            supplier: Some(SupplierCode::Local),
            hotel_id: "hotel-alfama".to_string(),
            room_type_id: room.to_string(),
            rate_plan_id: plan.to_string(),
            stay: StayQuery {
                check_in,
                check_out: check_in + chrono::Duration::days(2),
                adults,
                children,
                rooms,
            },
            add_ons: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_selection_pricing_with_add_ons() {
        let mut req = request("room-alfama-double", "rp-alfama-flex", 2, 0, 1);
        req.add_ons = vec![
            AddOnSelection { add_on_id: "addon-parking".to_string(), quantity: 1 },
            AddOnSelection { add_on_id: "addon-breakfast-upgrade".to_string(), quantity: 1 },
        ];

        let selection = assembler().assemble(&req).await.unwrap();
        assert_eq!(selection.nights, 2);
        assert_eq!(selection.supplier, SupplierCode::Local);
        assert!(selection.room_type.rate_plans.is_empty());

        // 90*2 + 10*2 + 20
        assert_eq!(selection.rate_plan.total_amount, Decimal::from(220));
        assert_eq!(selection.pricing.room_subtotal, Decimal::from(180));
        assert_eq!(selection.pricing.taxes, Decimal::from(20));
        assert_eq!(selection.pricing.fees, Decimal::from(20));
        // parking 15*2 nights, breakfast 12*2 guests*2 nights
        assert_eq!(selection.pricing.add_ons_total, Decimal::from(78));
        assert_eq!(selection.pricing.grand_total, Decimal::from(298));
        assert_eq!(
            selection.pricing.grand_total,
            selection.rate_plan.total_amount + selection.pricing.add_ons_total
        );
    }

    #[tokio::test]
    async fn test_sold_out_rate_is_rejected() {
        let err = assembler()
            .assemble(&request("room-alfama-double", "rp-alfama-nr", 2, 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Invalid(msg) if msg.contains("0 room(s) left")));
    }

    #[tokio::test]
    async fn test_capacity_is_checked_per_room() {
        let err = assembler()
            .assemble(&request("room-alfama-double", "rp-alfama-flex", 3, 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Invalid(msg) if msg.contains("adults")));

        let err = assembler()
            .assemble(&request("room-alfama-double", "rp-alfama-flex", 2, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Invalid(msg) if msg.contains("children")));

        // Two doubles hold four adults
        assert!(assembler()
            .assemble(&request("room-alfama-double", "rp-alfama-flex", 4, 0, 2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let mut req = request("room-alfama-double", "rp-alfama-flex", 2, 0, 1);
        req.hotel_id = "hotel-nowhere".to_string();
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::HotelNotFound(_))));

        let req = request("room-penthouse", "rp-alfama-flex", 2, 0, 1);
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::Invalid(_))));

        // Rate plan belongs to another room
        let req = request("room-alfama-family", "rp-alfama-flex", 2, 0, 1);
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::Invalid(_))));

        let mut req = request("room-alfama-double", "rp-alfama-flex", 2, 0, 1);
        req.add_ons = vec![AddOnSelection { add_on_id: "addon-spa".to_string(), quantity: 1 }];
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_invalid_stay_rejected_before_lookup() {
        let mut req = request("room-alfama-double", "rp-alfama-flex", 2, 0, 1);
        req.stay.check_out = req.stay.check_in;
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_oversized_party_is_rejected() {
        let req = request("room-alfama-double", "rp-alfama-flex", 3_000_000_000, 0, 3_000_000_000);
        assert!(matches!(assembler().assemble(&req).await, Err(SelectionError::Invalid(msg)) if msg.contains("at most")));
    }
}

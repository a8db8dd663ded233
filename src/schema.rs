//! Column names and fixed constants shared by every pipeline stage.

use chrono::NaiveDate;

pub const PRIMARY_KEY_ALT: &str = "PrimaryKeyAlt";
pub const PRIMARY_KEY_ITEM: &str = "PrimaryKeyItem";
pub const ORDER_PLACED_DATE: &str = "OrderPlacedDate";
pub const PRODUCT_PLU: &str = "ProductPLU";
pub const PRODUCT_NAME: &str = "ProductName";
pub const QUANTITY: &str = "Quantity";
pub const GROSS_AOV: &str = "GrossAOV";
pub const PROMOTIONS_ON_ITEMS: &str = "PromotionsOnItems";
pub const DRIVER_TIP: &str = "DriverTip";

pub const ITEM_PRICE: &str = "ItemPrice";
pub const ITEM_QUANTITY: &str = "ItemQuantity";

pub const TOTAL_ITEM_COST: &str = "TotalItemCost";
pub const PRIMARY_KEY_INDEX: &str = "PrimaryKeyIndex";
pub const ITEM_INDEX: &str = "ItemIndex";

/// Per-order aggregate columns used while reconciling. Never exported.
pub const SUMMED_COST: &str = "SummedCost";
pub const PRICE_DIFFERENCE: &str = "PriceDifference";

pub const ORDER_COLUMNS: [&str; 9] = [
    PRIMARY_KEY_ALT,
    PRIMARY_KEY_ITEM,
    ORDER_PLACED_DATE,
    PRODUCT_PLU,
    PRODUCT_NAME,
    QUANTITY,
    GROSS_AOV,
    PROMOTIONS_ON_ITEMS,
    DRIVER_TIP,
];

pub const ITEM_COLUMNS: [&str; 3] = [PRIMARY_KEY_ITEM, ITEM_PRICE, ITEM_QUANTITY];

/// Orders placed before this date are dropped. The date itself is kept.
pub fn retention_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Decimal places used when comparing summed item cost against gross order value.
pub const MONEY_PRECISION: u32 = 2;

pub const BALANCING_PLU: &str = "x-xx-xxxx-x";
pub const BALANCING_NAME: &str = "Balancing Item";

/// Greater than any natural item position, so the balancing row sorts last in its order.
pub const BALANCING_ITEM_INDEX: u32 = 500;

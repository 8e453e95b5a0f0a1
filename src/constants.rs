pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

pub const MIN_RECIPE_NAME_LENGTH: usize = 4;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

pub const NAME_FIELD_LENGTH: usize = 200;
pub const COLOR_FIELD_LENGTH: usize = 7;

pub const SHOPPING_LIST_HEADER: &str = "Список покупок:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

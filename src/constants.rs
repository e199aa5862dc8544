pub const SHOPPING_LIST_HEADER: &str = "Your personal shopping list:";
pub const SHOPPING_LIST_FILE_SUFFIX: &str = "shopping_list.txt";

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_NAME_MAX_LENGTH: usize = 200;
pub const TAG_SLUG_MAX_LENGTH: usize = 200;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

/// Rows per INSERT when bulk loading the ingredient catalog.
pub const INGREDIENT_IMPORT_BATCH_SIZE: usize = 1000;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub const RECIPE_CACHE_KEY: &str = "recipe-cache-key";
pub const CATALOG_CACHE_KEY: &str = "catalog-cache-key";

pub const PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const SHORT_LINK_MIN_LENGTH: usize = 8;
pub const SHORT_LINK_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 150;
pub const RECIPE_NAME_MAX_LENGTH: usize = 256;

pub const MIN_AMOUNT: i32 = 1;
pub const MIN_COOKING_TIME: i32 = 1;

/// Upper bound for json bodies, base64 images included.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub const AVATAR_FOLDER: &str = "users";
pub const RECIPE_IMAGE_FOLDER: &str = "recipes";

pub const SHOPPING_CART_FILENAME: &str = "shopping_cart.csv";
pub const SHOPPING_CART_HEADER: &[&str] = &["Ingredient", "Amount"];

pub const TAG_CACHE_BIND: &str = "tag-cache-key";
pub const INGREDIENT_CACHE_BIND: &str = "ingredient-cache-key";

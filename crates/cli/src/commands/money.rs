//! Money formatting command.

use theme_cart_core::{DEFAULT_MONEY_FORMAT, format_money};

/// Print `cents` formatted with `pattern`, falling back to
/// `THEME_MONEY_FORMAT` and then the default pattern.
#[allow(clippy::print_stdout)]
pub fn format(cents: i64, pattern: Option<&str>) {
    let pattern = pattern.map_or_else(
        || std::env::var("THEME_MONEY_FORMAT").unwrap_or_else(|_| DEFAULT_MONEY_FORMAT.to_string()),
        str::to_string,
    );
    println!("{}", format_money(cents, &pattern));
}

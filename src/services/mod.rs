// QuietBrowser services
// Services provide stateless or process-wide functionality: rule compilation, address resolution, start page lookup, settings.

pub mod address_resolver;
pub mod content_filter;
pub mod settings_engine;
pub mod start_page;

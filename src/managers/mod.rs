// QuietBrowser state managers
// Managers own the tab registry and everything that drives its views: lifecycle, navigation policy, and async completions.

pub mod completion;
pub mod navigation_policy;
pub mod tab_manager;
pub mod view_lifecycle;

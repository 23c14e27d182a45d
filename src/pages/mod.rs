//! Page loaders and their display models
//!
//! Loaders talk to the CMS and produce normalized content; the `*_view`
//! functions turn that content into what the templates and CLI print.

mod home;
mod post;

pub use home::{home_view, load_home, HomeView, PostCard};
pub use post::{load_post, post_view, CommentsView, NavView, PostPage, PostView};

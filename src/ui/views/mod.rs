mod post_detail;
mod post_form;
mod post_list;

pub use post_detail::PostDetailView;
pub use post_form::PostFormView;
pub use post_list::PostListView;

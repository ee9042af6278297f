use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::db::comments::{self, CommentNode};
use crate::db::models::{AcademicFeatureType, PostCategory, VoteDirection};
use crate::db::posts::{self, PostSummary};
use crate::db::users;
use crate::db::votes;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{flash_redirect, Flash, IncomingFlash};
use crate::profanity::{clean_text, contains_profanity};
use crate::routes::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub flash: Option<Flash>,
    pub viewer: Option<CurrentUser>,
    pub posts: Vec<PostSummary>,
    pub page: i64,
    pub total_pages: i64,
    pub query: String,
    pub current_cat: String,
    pub categories: Vec<PostCategory>,
}

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub flash: Option<Flash>,
    pub categories: Vec<PostCategory>,
}

#[derive(Template)]
#[template(path = "pages/post_detail.html")]
pub struct PostDetailTemplate {
    pub flash: Option<Flash>,
    pub id: String,
    pub title: String,
    pub body: String,
    pub category_label: &'static str,
    pub author: String,
    pub author_id: String,
    pub created_at: String,
    pub view_count: i64,
    pub score: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub realism: String,
    pub experience_count: i64,
    pub wish_knew_count: i64,
    pub logged_in: bool,
    pub viewer_id: String,
    pub can_delete: bool,
    pub viewer_is_admin: bool,
    pub my_upvoted: bool,
    pub my_downvoted: bool,
    pub my_realism: i64,
    pub my_experience: bool,
    pub my_wish_knew: bool,
    pub comments: Vec<CommentNode>,
}

// -- Forms / queries --

#[derive(Deserialize)]
pub struct IndexQuery {
    pub page: Option<i64>,
    pub q: Option<String>,
    pub cat: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePostForm {
    pub title: String,
    pub content: String,
    pub category: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AcademicVoteForm {
    pub value: Option<i64>,
}

// -- Handlers --

/// GET / — paginated listing with search and category filter.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexQuery>,
    viewer: MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Html<IndexTemplate>> {
    let page = params.page.unwrap_or(1).max(1);
    let query = params.q.unwrap_or_default().trim().to_string();
    // An unknown category slug simply means no filter.
    let category = params.cat.as_deref().and_then(PostCategory::from_slug);

    let per_page = state.config.forum.posts_per_page;
    let (posts, total) = posts::list_posts(&state.db, page, per_page, &query, category)?;
    let total_pages = ((total + per_page - 1) / per_page).max(1);

    Ok(Html(IndexTemplate {
        flash: flash.0,
        viewer: viewer.0,
        posts,
        page,
        total_pages,
        query,
        current_cat: category.map(|c| c.as_slug().to_string()).unwrap_or_default(),
        categories: PostCategory::ALL.to_vec(),
    }))
}

pub async fn create_page(
    _user: CurrentUser,
    flash: IncomingFlash,
) -> AppResult<Html<CreatePostTemplate>> {
    Ok(Html(CreatePostTemplate {
        flash: flash.0,
        categories: PostCategory::ALL.to_vec(),
    }))
}

/// POST /create
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    axum::Form(form): axum::Form<CreatePostForm>,
) -> AppResult<Response> {
    let title = form.title.trim();
    let content = form.content.trim();

    if title.is_empty() || content.is_empty() {
        return Ok(flash_redirect(
            "/create",
            Flash::error("Title and content cannot be empty."),
        ));
    }

    if contains_profanity(title) || contains_profanity(content) {
        return Ok(flash_redirect(
            "/create",
            Flash::error("Banned words found in the post."),
        ));
    }

    let Some(category) = PostCategory::from_slug(&form.category) else {
        return Ok(flash_redirect("/create", Flash::error("Invalid category.")));
    };

    posts::create_post(&state.db, &user.id, title, content, category)?;
    Ok(Redirect::to("/").into_response())
}

/// GET /post/{post_id} — detail page; counts the authenticated viewer's
/// first visit.
pub async fn view_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    viewer: MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Html<PostDetailTemplate>> {
    let mut post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;

    if let Some(user) = &viewer.0 {
        if posts::record_view(&state.db, &post.id, &user.id)? {
            post.view_count += 1;
        }
    }

    let author = users::find_by_id(&state.db, &post.author_id)?
        .map(|u| u.username)
        .ok_or(AppError::NotFound)?;

    let stats = posts::post_stats(&state.db, &post.id)?;
    let comments = comments::visible_comments(&state.db, &post.id)?;

    let my_votes = match &viewer.0 {
        Some(user) => votes::user_votes(&state.db, &user.id, &post.id)?,
        None => Default::default(),
    };

    let (logged_in, viewer_id, can_delete, viewer_is_admin) = match &viewer.0 {
        Some(user) => (
            true,
            user.id.clone(),
            user.id == post.author_id || user.is_admin,
            user.is_admin,
        ),
        None => (false, String::new(), false, false),
    };

    Ok(Html(PostDetailTemplate {
        flash: flash.0,
        id: post.id,
        title: post.title,
        body: post.body,
        category_label: post.category.label(),
        author,
        author_id: post.author_id,
        created_at: post.created_at,
        view_count: post.view_count,
        score: stats.score,
        like_count: stats.like_count,
        dislike_count: stats.dislike_count,
        realism: format!("{:.1}", stats.realism_average),
        experience_count: stats.experience_count,
        wish_knew_count: stats.wish_knew_count,
        logged_in,
        viewer_id,
        can_delete,
        viewer_is_admin,
        my_upvoted: my_votes.main_vote == Some(1),
        my_downvoted: my_votes.main_vote == Some(-1),
        my_realism: my_votes.realism_score.unwrap_or(0),
        my_experience: my_votes.is_experience,
        my_wish_knew: my_votes.is_wish_knew,
        comments,
    }))
}

/// POST /add_comment/{post_id} — fields `content`, optional `parent_id`.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    user: CurrentUser,
    axum::Form(form): axum::Form<CommentForm>,
) -> AppResult<Response> {
    let post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    let back = format!("/post/{}", post.id);

    let content = form.content.trim();
    if content.is_empty() {
        return Ok(flash_redirect(&back, Flash::error("A comment cannot be empty.")));
    }
    if contains_profanity(content) {
        return Ok(flash_redirect(
            &back,
            Flash::error("Your comment contains banned words."),
        ));
    }

    let parent_id = form
        .parent_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    comments::add_comment(&state.db, &post.id, &user.id, &clean_text(content), parent_id)?;

    Ok(flash_redirect(&back, Flash::success("Comment added.")))
}

/// GET /vote/{post_id}/{up|down}
pub async fn vote(
    State(state): State<AppState>,
    Path((post_id, action)): Path<(String, String)>,
    user: CurrentUser,
) -> AppResult<Response> {
    let direction = VoteDirection::from_action(&action)
        .ok_or_else(|| AppError::BadRequest("Unknown vote action".into()))?;
    let post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;

    votes::toggle_vote(&state.db, &user.id, &post.id, direction)?;
    Ok(Redirect::to(&format!("/post/{}", post.id)).into_response())
}

/// POST /vote_academic/{post_id}/{type} — field `value`.
pub async fn vote_academic(
    State(state): State<AppState>,
    Path((post_id, vtype)): Path<(String, String)>,
    user: CurrentUser,
    axum::Form(form): axum::Form<AcademicVoteForm>,
) -> AppResult<Response> {
    let feature = AcademicFeatureType::from_slug(&vtype)
        .ok_or_else(|| AppError::BadRequest("Unknown academic vote type".into()))?;
    let post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    let back = format!("/post/{}", post.id);

    let value = form.value.unwrap_or(1);
    if feature == AcademicFeatureType::RealismScore && !(1..=10).contains(&value) {
        return Ok(flash_redirect(
            &back,
            Flash::error("Realism score must be between 1 and 10."),
        ));
    }

    votes::vote_academic(&state.db, &user.id, &post.id, feature, value)?;
    Ok(Redirect::to(&back).into_response())
}

/// POST /delete_post/{post_id} — author or admin.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    user: CurrentUser,
) -> AppResult<Response> {
    let post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id && !user.is_admin {
        return Err(AppError::Forbidden);
    }

    posts::delete_post(&state.db, &post.id)?;
    Ok(flash_redirect("/", Flash::success("Post deleted.")))
}

/// POST /delete_comment/{comment_id} — author or admin.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    user: CurrentUser,
) -> AppResult<Response> {
    let comment = comments::get_comment(&state.db, &comment_id)?.ok_or(AppError::NotFound)?;
    if comment.author_id != user.id && !user.is_admin {
        return Err(AppError::Forbidden);
    }

    comments::delete_comment(&state.db, &comment.id)?;
    Ok(flash_redirect(
        &format!("/post/{}", comment.post_id),
        Flash::success("Comment deleted."),
    ))
}

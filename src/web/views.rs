//! HTML pages.
//!
//! Every string that originates from a user or from OMDb goes through
//! [`escape`] before it is written into markup.

use std::fmt::Write;

use super::flash::FlashMessage;
use super::paths;
use crate::db::{Movie, User};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<&FlashMessage>, body: &str) -> String {
    let flash = flash
        .map(|f| {
            format!(
                "<div class=\"flash flash-{}\">{}</div>\n",
                f.level.as_str(),
                escape(&f.text)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - MoviWeb</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<nav><a href="/">MoviWeb</a> <a href="/users">Users</a> <a href="/users/add">Add User</a></nav>
<main>
{flash}{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        flash = flash,
        body = body,
    )
}

pub fn home_page(flash: Option<&FlashMessage>) -> String {
    layout(
        "Home",
        flash,
        r#"<h1>Welcome to MoviWeb</h1>
<p>Keep track of the movies you love. Pick a user to see their list, or create a new one.</p>
<p><a class="button" href="/users">Browse users</a> <a class="button" href="/users/add">Add a user</a></p>"#,
    )
}

pub fn users_page(flash: Option<&FlashMessage>, users: &[User]) -> String {
    let mut body = String::from("<h1>Users</h1>\n");
    if users.is_empty() {
        body.push_str("<p>No users yet.</p>\n");
    } else {
        body.push_str("<ul class=\"users\">\n");
        for user in users {
            let _ = writeln!(
                body,
                r#"<li><a href="{page}">{name}</a>
<form method="post" action="{delete}" class="inline"><button type="submit">Delete</button></form></li>"#,
                page = paths::user(user.id),
                name = escape(&user.name),
                delete = paths::delete_user(user.id),
            );
        }
        body.push_str("</ul>\n");
    }
    body.push_str("<p><a class=\"button\" href=\"/users/add\">Add User</a></p>\n");
    layout("Users", flash, &body)
}

fn display_opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| escape(&v.to_string()))
        .unwrap_or_else(|| "&ndash;".to_string())
}

pub fn user_movies_page(flash: Option<&FlashMessage>, user: &User, movies: &[Movie]) -> String {
    let mut body = format!("<h1>{}'s movies</h1>\n", escape(&user.name));
    if movies.is_empty() {
        body.push_str("<p>No movies yet.</p>\n");
    } else {
        body.push_str(
            "<table class=\"movies\">\n<tr><th>Title</th><th>Director</th><th>Year</th><th>Rating</th><th></th></tr>\n",
        );
        for movie in movies {
            let _ = writeln!(
                body,
                r#"<tr><td>{name}</td><td>{director}</td><td>{year}</td><td>{rating}</td>
<td><a href="{update}">Edit</a>
<form method="post" action="{delete}" class="inline"><button type="submit">Delete</button></form></td></tr>"#,
                name = escape(&movie.name),
                director = display_opt(&movie.director),
                year = display_opt(&movie.year),
                rating = display_opt(&movie.rating),
                update = paths::update_movie(user.id, movie.id),
                delete = paths::delete_movie(user.id, movie.id),
            );
        }
        body.push_str("</table>\n");
    }
    let _ = writeln!(
        body,
        r#"<p><a class="button" href="{}">Add Movie</a></p>"#,
        paths::add_movie(user.id)
    );
    layout(&user.name, flash, &body)
}

pub fn add_user_page(flash: Option<&FlashMessage>) -> String {
    layout(
        "Add User",
        flash,
        r#"<h1>Add New User</h1>
<form method="post" action="/users/add">
<label>Name <input type="text" name="name" maxlength="50" required></label>
<button type="submit">Add User</button>
</form>"#,
    )
}

pub fn add_movie_page(flash: Option<&FlashMessage>, user: &User) -> String {
    let body = format!(
        r#"<h1>Add a movie for {name}</h1>
<form method="post" action="{action}">
<label>Title <input type="text" name="name" maxlength="100" required></label>
<fieldset>
<label><input type="radio" name="mode" value="lookup" checked> Look up details on OMDb</label>
<label><input type="radio" name="mode" value="manual"> Enter details myself</label>
</fieldset>
<label>Director <input type="text" name="director" maxlength="100"></label>
<label>Year <input type="number" name="year"></label>
<label>Rating <input type="number" name="rating" step="0.1" min="1" max="10"></label>
<button type="submit">Add Movie</button>
</form>
<p><a href="{back}">Back</a></p>"#,
        name = escape(&user.name),
        action = paths::add_movie(user.id),
        back = paths::user(user.id),
    );
    layout("Add Movie", flash, &body)
}

fn value_attr<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| escape(&v.to_string())).unwrap_or_default()
}

pub fn update_movie_page(flash: Option<&FlashMessage>, user_id: i64, movie: &Movie) -> String {
    let body = format!(
        r#"<h1>Update {name}</h1>
<form method="post" action="{action}">
<label>Title <input type="text" name="name" maxlength="100" value="{name}"></label>
<label>Director <input type="text" name="director" maxlength="100" value="{director}"></label>
<label>Year <input type="number" name="year" value="{year}"></label>
<label>Rating <input type="number" name="rating" step="0.1" min="1" max="10" value="{rating}"></label>
<button type="submit">Update Movie</button>
</form>
<p><a href="{back}">Back</a></p>"#,
        name = escape(&movie.name),
        director = value_attr(&movie.director),
        year = value_attr(&movie.year),
        rating = value_attr(&movie.rating),
        action = paths::update_movie(user_id, movie.id),
        back = paths::user(user_id),
    );
    layout("Update Movie", flash, &body)
}

pub fn not_found_page() -> String {
    layout(
        "Not Found",
        None,
        "<h1>Page not found</h1>\n<p>The page you are looking for does not exist.</p>\n<p><a href=\"/\">Home</a></p>",
    )
}

pub fn bad_request_page() -> String {
    layout(
        "Bad Request",
        None,
        "<h1>Bad request</h1>\n<p>The submitted form could not be read.</p>\n<p><a href=\"/\">Home</a></p>",
    )
}

pub fn server_error_page() -> String {
    layout(
        "Error",
        None,
        "<h1>Something went wrong</h1>\n<p>An unexpected error occurred. Please try again later.</p>\n<p><a href=\"/\">Home</a></p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::flash::FlashLevel;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_user_movies_page_escapes_titles() {
        let user = User {
            id: 1,
            name: "alice".to_string(),
        };
        let movies = vec![Movie {
            id: 3,
            name: "<Nope>".to_string(),
            director: None,
            year: Some(2022),
            rating: Some(6.8),
            user_id: 1,
        }];
        let flash = FlashMessage {
            level: FlashLevel::Success,
            text: "Movie added successfully".to_string(),
        };

        let html = user_movies_page(Some(&flash), &user, &movies);
        assert!(html.contains("&lt;Nope&gt;"));
        assert!(!html.contains("<Nope>"));
        assert!(html.contains("flash-success"));
        assert!(html.contains("/users/1/update_movie/3"));
        assert!(html.contains("/users/1/delete_movie/3"));
    }
}

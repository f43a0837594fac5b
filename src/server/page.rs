use crate::squash::steps::escape_html;
use crate::squash::Step;

/// Render the single page of the service.
///
/// Shows the login button or the squash form depending on `user`, and the
/// progress of the last squash when `steps` is non-empty.
pub fn render_page(user: Option<&str>, steps: &[Step], pull_url: &str) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Squasher</title>\n</head>\n<body>\n",
    );
    html.push_str("<h1>Squasher</h1>\n");
    html.push_str(
        "<p>Replaces the commits of a pull request with a single commit carrying its title and description, and force-pushes it onto the pull request's branch.</p>\n",
    );

    match user {
        Some(login) => {
            html.push_str(&format!(
                "<p>Logged in as <strong>{}</strong>. <a href=\"/logout\">Log out</a></p>\n",
                escape_html(login)
            ));
            html.push_str(&format!(
                "<form method=\"post\" action=\"/\">\n<label>Pull request URL: <input type=\"url\" name=\"pull_url\" size=\"60\" value=\"{}\"></label>\n<button type=\"submit\">Squash!</button>\n</form>\n",
                escape_html(pull_url)
            ));
        }
        None => {
            html.push_str(
                "<form method=\"post\" action=\"/login\">\n<button type=\"submit\">Log in with GitHub</button>\n</form>\n",
            );
        }
    }

    if !steps.is_empty() {
        html.push_str("<ol class=\"steps\">\n");
        for step in steps {
            html.push_str(&format!("<li>{}</li>\n", step.html()));
        }
        html.push_str("</ol>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

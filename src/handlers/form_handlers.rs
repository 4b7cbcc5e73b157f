//! `GET /` — the upload form.

use axum::response::Html;

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Upload File to the exam archive</title>
  </head>
  <body>
    <h1>Upload File to the exam archive</h1>
    <form action="/upload" method="post" enctype="multipart/form-data">
      <label for="study">Study:</label>
      <select id="study" name="study">
        <option value="computer-science">Computer Science</option>
        <option value="applied-mathematics">Applied Mathematics</option>
      </select>
      <label for="year">Academic year:</label>
      <select id="year" name="year">
        <option value="first-year">First Year</option>
        <option value="second-year">Second Year</option>
        <option value="third-year">Third Year</option>
        <option value="master">Master</option>
      </select>
      <label for="code">Study Code:</label>
      <input type="text" id="code" name="code" pattern="[A-Z]{2}\d{4}" title="Please enter a code with two capitalized letters followed by four numbers." required>
      <label for="type">Type:</label>
      <select id="type" name="type">
        <option value="exam">Exam</option>
        <option value="midterm">Mid-term</option>
        <option value="resit">Resit</option>
        <option value="summary">Summary</option>
      </select>
      <label for="date">Exam date (optional):</label>
      <input type="date" id="date" name="date">
      <label for="answers">
        <input type="checkbox" id="answers" name="answers">
        Answers
      </label>
      <label for="file">Select a file:</label>
      <input type="file" name="file" id="file" accept="application/pdf" required>
      <br><br>
      <input type="submit" value="Upload">
    </form>
  </body>
</html>
"#;

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

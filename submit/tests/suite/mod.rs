mod callbacks;
mod over_http;

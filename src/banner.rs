// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
                _       __                       
  ___ ___   __| | ___ / _| ___  _ __ __ _  ___  
 / __/ _ \ / _` |/ _ \ |_ / _ \| '__/ _` |/ _ \ 
| (_| (_) | (_| |  __/  _| (_) | | | (_| |  __/ 
 \___\___/ \__,_|\___|_|  \___/|_|  \__, |\___| 
                                    |___/       

    Proctored Coding Tests & Remote Judging
"#;
    println!("{}", banner);
}
